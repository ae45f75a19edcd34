use crate::utils::error::DermaError;
use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Sentinel shown when a model emits an identifier outside the label table,
/// or when the detector finds nothing.
pub const FALLBACK_LABEL: &str = "Tidak terdefinisikan";
pub const FALLBACK_DESCRIPTION: &str = "Deskripsi tidak ditemukan.";

/// Label table bundled with the binary; used when no `labels.json` is
/// present next to the models.
const BUNDLED_LABELS: &str = include_str!("../data/labels.json");

#[derive(Debug, Clone, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct LabelFile {
    classes: Vec<LabelEntry>,
}

/// Static class-identifier table, loaded once at startup and shared
/// read-only. The entry order is the canonical index->name mapping every
/// backend converts through at its boundary.
#[derive(Debug, Clone)]
pub struct LabelMap {
    entries: Vec<LabelEntry>,
    by_lower_name: HashMap<String, usize>,
}

impl LabelMap {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LabelFile = serde_json::from_str(json)?;
        if file.classes.is_empty() {
            return Err(DermaError::Config("Label table has no classes".to_string()));
        }

        let by_lower_name = file
            .classes
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.name.to_lowercase(), i))
            .collect();

        Ok(Self {
            entries: file.classes,
            by_lower_name,
        })
    }

    /// Load the table from disk, falling back to the bundled copy.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::info!("Loading label table from: {}", path.display());
            let json = std::fs::read_to_string(path)?;
            Self::from_json(&json)
        } else {
            tracing::info!("Label table {} not found, using bundled copy", path.display());
            Self::from_json(BUNDLED_LABELS)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical class names in index order; the detector uses these to
    /// bound and log its decoded class range.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Convert a model's class index to its canonical string identifier.
    pub fn name_for_index(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.name.as_str())
    }

    /// Case-insensitive lookup. Missing identifiers resolve to the fixed
    /// fallback pair rather than failing.
    pub fn resolve(&self, class_name: &str) -> (&str, &str) {
        match self.by_lower_name.get(&class_name.to_lowercase()) {
            Some(&i) => {
                let entry = &self.entries[i];
                (entry.name.as_str(), entry.description.as_str())
            }
            None => (FALLBACK_LABEL, FALLBACK_DESCRIPTION),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> LabelMap {
        LabelMap::from_json(BUNDLED_LABELS).unwrap()
    }

    #[test]
    fn bundled_table_has_four_classes_in_order() {
        let map = bundled();
        assert_eq!(map.len(), 4);
        assert_eq!(map.name_for_index(0), Some("Akiec"));
        assert_eq!(map.name_for_index(3), Some("Nv"));
        assert_eq!(map.name_for_index(4), None);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let map = bundled();
        let (name, desc) = map.resolve("bCC");
        assert_eq!(name, "Bcc");
        assert!(desc.starts_with("Basal Cell Carcinoma"));
    }

    #[test]
    fn missing_key_resolves_to_fallback_pair() {
        let map = bundled();
        let (name, desc) = map.resolve("melanoma");
        assert_eq!(name, FALLBACK_LABEL);
        assert_eq!(desc, FALLBACK_DESCRIPTION);
    }

    #[test]
    fn empty_table_is_a_config_error() {
        assert!(LabelMap::from_json(r#"{"classes":[]}"#).is_err());
    }
}
