pub mod classifier;
pub mod detector;
pub mod forest;
pub mod manager;

pub use classifier::Classifier;
pub use detector::Detector;
pub use forest::Forest;
pub use manager::{ModelManager, ModelStats};

use crate::Result;
use image::{DynamicImage, RgbImage};
use serde::Deserialize;

/// The three interchangeable model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Detector,
    Classifier,
    Forest,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Detector => "detector",
            Variant::Classifier => "classifier",
            Variant::Forest => "forest",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = crate::DermaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "detector" => Ok(Variant::Detector),
            "classifier" => Ok(Variant::Classifier),
            "forest" => Ok(Variant::Forest),
            other => Err(crate::DermaError::InvalidInput(format!(
                "Unknown model variant '{}', expected detector/classifier/forest",
                other
            ))),
        }
    }
}

/// Top prediction from a single backend. `class` is `None` when the detector
/// finds nothing above its confidence threshold; that is a valid empty
/// result, not an error. Confidence is a probability in [0,1].
#[derive(Debug, Clone)]
pub struct Prediction {
    pub class: Option<usize>,
    pub confidence: Option<f32>,
    pub annotated: Option<RgbImage>,
}

impl Prediction {
    pub fn empty() -> Self {
        Self {
            class: None,
            confidence: None,
            annotated: None,
        }
    }
}

/// Uniform capability every backend implements. Sessions are loaded once and
/// shared read-only; `predict` takes the decoded upload and performs its own
/// variant-specific resize/normalize internally.
pub trait LesionModel: Send + Sync {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn variant_parses_from_request_strings() {
        assert_eq!(Variant::from_str("detector").unwrap(), Variant::Detector);
        assert_eq!(Variant::from_str("forest").unwrap(), Variant::Forest);
        assert!(Variant::from_str("svm").is_err());
    }

    #[test]
    fn empty_prediction_has_no_class_or_confidence() {
        let p = Prediction::empty();
        assert!(p.class.is_none());
        assert!(p.confidence.is_none());
        assert!(p.annotated.is_none());
    }
}
