use serde::Serialize;

/// Result of one inference request. Immutable, produced once per request,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    /// Resolved display name, or the sentinel when nothing was detected
    pub label: String,

    /// Canned long-form description for the resolved class
    pub description: String,

    /// Confidence percentage in [0,100]; absent when the detector found
    /// nothing above its threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_pct: Option<f32>,

    /// Wall-clock latency of the inference call, for display only
    pub latency_ms: f32,

    /// Which backend produced this result
    pub variant: String,

    /// Whether an annotated detection artifact was written
    pub annotated: bool,
}

impl Diagnosis {
    /// Two-decimal confidence rendering used by the UI ("83.00%").
    pub fn confidence_display(&self) -> String {
        match self.confidence_pct {
            Some(pct) => format!("{:.2}%", pct),
            None => "-".to_string(),
        }
    }
}
