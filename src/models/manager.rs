use crate::labels::LabelMap;
use crate::models::{Classifier, Detector, Forest, LesionModel, Variant};
use crate::utils::error::DermaError;
use crate::{Config, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Process-lifetime model handles, loaded once at startup and injected into
/// the pipeline. A variant whose model file fails to load stays unavailable
/// for the life of the process; requests for it fail with `ModelLoad` while
/// the other variants keep serving.
pub struct ModelManager {
    models: HashMap<Variant, Arc<dyn LesionModel>>,
    intra_threads: usize,
    optimization_level: i32,
}

impl ModelManager {
    /// Load every variant whose model file is present.
    pub fn init(config: &Config, labels: &LabelMap) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let mut models: HashMap<Variant, Arc<dyn LesionModel>> = HashMap::new();

        match Detector::new(config, labels.names()) {
            Ok(det) => {
                models.insert(Variant::Detector, Arc::new(det));
                tracing::info!("Detection model loaded");
            }
            Err(e) => tracing::warn!("Detection model unavailable: {}", e),
        }

        match Classifier::new(config) {
            Ok(cls) => {
                models.insert(Variant::Classifier, Arc::new(cls));
                tracing::info!("Classification model loaded");
            }
            Err(e) => tracing::warn!("Classification model unavailable: {}", e),
        }

        match Forest::new(config) {
            Ok(forest) => {
                models.insert(Variant::Forest, Arc::new(forest));
                tracing::info!("Random-forest model loaded");
            }
            Err(e) => tracing::warn!("Random-forest model unavailable: {}", e),
        }

        if models.is_empty() {
            return Err(DermaError::ModelLoad(format!(
                "No model could be loaded from {}",
                config.models_dir.display()
            )));
        }

        tracing::info!("Model manager initialized with {} variant(s)", models.len());
        Ok(Self {
            models,
            intra_threads: config.onnx_config.intra_threads,
            optimization_level: config.onnx_config.optimization_level,
        })
    }

    /// Build a manager from explicit handles; the substitution point for
    /// fake models in tests.
    pub fn from_models(models: HashMap<Variant, Arc<dyn LesionModel>>) -> Self {
        Self {
            models,
            intra_threads: 1,
            optimization_level: 3,
        }
    }

    /// Shared handle for a variant, or `ModelLoad` if it never loaded.
    pub fn model(&self, variant: Variant) -> Result<Arc<dyn LesionModel>> {
        self.models
            .get(&variant)
            .map(Arc::clone)
            .ok_or_else(|| {
                DermaError::ModelLoad(format!("Model variant '{}' is not available", variant))
            })
    }

    pub fn is_available(&self, variant: Variant) -> bool {
        self.models.contains_key(&variant)
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            has_detector: self.is_available(Variant::Detector),
            has_classifier: self.is_available(Variant::Classifier),
            has_forest: self.is_available(Variant::Forest),
            intra_threads: self.intra_threads,
            optimization_level: self.optimization_level,
        }
    }
}

/// Variant availability and session settings, exposed on the info endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub has_detector: bool,
    pub has_classifier: bool,
    pub has_forest: bool,
    pub intra_threads: usize,
    pub optimization_level: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prediction;
    use image::DynamicImage;

    struct FixedModel;

    impl LesionModel for FixedModel {
        fn predict(&self, _image: &DynamicImage) -> crate::Result<Prediction> {
            Ok(Prediction {
                class: Some(0),
                confidence: Some(0.5),
                annotated: None,
            })
        }
    }

    #[test]
    fn missing_variant_yields_model_load_error() {
        let mut models: HashMap<Variant, Arc<dyn LesionModel>> = HashMap::new();
        models.insert(Variant::Classifier, Arc::new(FixedModel));
        let manager = ModelManager::from_models(models);

        assert!(manager.model(Variant::Classifier).is_ok());
        assert!(matches!(
            manager.model(Variant::Detector),
            Err(DermaError::ModelLoad(_))
        ));

        let stats = manager.stats();
        assert!(stats.has_classifier);
        assert!(!stats.has_detector && !stats.has_forest);
    }
}
