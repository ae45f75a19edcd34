use crate::image::ImageLoader;
use crate::labels::{LabelMap, FALLBACK_LABEL};
use crate::models::{ModelManager, Variant};
use crate::pipeline::Diagnosis;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Request pipeline: decode -> variant-specific preprocess/predict ->
/// identifier resolution. Model handles and the label table are injected at
/// construction so tests can substitute fakes.
pub struct Pipeline {
    manager: Arc<ModelManager>,
    labels: Arc<LabelMap>,
    annotated_path: PathBuf,
}

impl Pipeline {
    pub fn new(manager: Arc<ModelManager>, labels: Arc<LabelMap>, annotated_path: PathBuf) -> Self {
        Self {
            manager,
            labels,
            annotated_path,
        }
    }

    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    /// Fixed location of the detector's annotated artifact.
    pub fn annotated_path(&self) -> &PathBuf {
        &self.annotated_path
    }

    /// Run one upload through the selected backend. Each failed step aborts
    /// this request only; nothing is retried.
    pub fn run(&self, image_bytes: &[u8], variant: Variant) -> Result<Diagnosis> {
        let image = ImageLoader::from_bytes(image_bytes)?;
        ImageLoader::validate_dimensions(&image)?;

        let model = self.manager.model(variant)?;

        let inference_start = Instant::now();
        let prediction = model.predict(&image)?;
        let latency_ms = inference_start.elapsed().as_secs_f32() * 1000.0;

        // Canonical identifier conversion happens here: model index -> class
        // name -> display name + description. An index outside the table
        // falls back instead of failing.
        let (label, description) = match prediction.class {
            Some(index) => match self.labels.name_for_index(index) {
                Some(name) => {
                    let (display, desc) = self.labels.resolve(name);
                    (display.to_string(), desc.to_string())
                }
                None => {
                    tracing::warn!(
                        "Model emitted class index {} outside label table ({} entries)",
                        index,
                        self.labels.len()
                    );
                    let (display, desc) = self.labels.resolve("");
                    (display.to_string(), desc.to_string())
                }
            },
            None => {
                let (display, desc) = self.labels.resolve(FALLBACK_LABEL);
                (display.to_string(), desc.to_string())
            }
        };

        // Detector artifact: overwritten every run, re-read for display.
        let annotated = match prediction.annotated {
            Some(ref img) => {
                img.save(&self.annotated_path)?;
                tracing::debug!("Annotated image written to {}", self.annotated_path.display());
                true
            }
            None => false,
        };

        let confidence_pct = prediction
            .confidence
            .map(|p| (p * 100.0).clamp(0.0, 100.0));

        tracing::info!(
            "Prediction complete: variant={} label={} confidence={:?} latency={:.2}ms",
            variant,
            label,
            confidence_pct,
            latency_ms
        );

        Ok(Diagnosis {
            label,
            description,
            confidence_pct,
            latency_ms,
            variant: variant.to_string(),
            annotated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::FALLBACK_DESCRIPTION;
    use crate::models::{LesionModel, Prediction};
    use crate::DermaError;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::collections::HashMap;

    struct FakeModel {
        prediction: Prediction,
    }

    impl LesionModel for FakeModel {
        fn predict(&self, _image: &DynamicImage) -> crate::Result<Prediction> {
            Ok(self.prediction.clone())
        }
    }

    fn labels() -> Arc<LabelMap> {
        Arc::new(
            LabelMap::from_json(
                r#"{"classes":[
                    {"name":"Akiec","description":"Lesi AKIEC."},
                    {"name":"Bcc","description":"Lesi BCC."}
                ]}"#,
            )
            .unwrap(),
        )
    }

    fn pipeline_with(variant: Variant, prediction: Prediction) -> Pipeline {
        let mut models: HashMap<Variant, Arc<dyn LesionModel>> = HashMap::new();
        models.insert(variant, Arc::new(FakeModel { prediction }));
        let dir = std::env::temp_dir().join(format!("derma-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Pipeline::new(
            Arc::new(ModelManager::from_models(models)),
            labels(),
            dir.join("deteksi_yolo.jpg"),
        )
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn classifier_argmax_zero_resolves_to_akiec_at_83_percent() {
        let pipeline = pipeline_with(
            Variant::Classifier,
            Prediction {
                class: Some(0),
                confidence: Some(0.83),
                annotated: None,
            },
        );

        let diag = pipeline.run(&png_bytes(224, 224), Variant::Classifier).unwrap();
        assert_eq!(diag.label, "Akiec");
        assert_eq!(diag.description, "Lesi AKIEC.");
        assert_eq!(diag.confidence_display(), "83.00%");
        assert!(!diag.annotated);
    }

    #[test]
    fn no_detection_resolves_to_sentinel_without_confidence() {
        let annotated = RgbImage::new(640, 640);
        let pipeline = pipeline_with(
            Variant::Detector,
            Prediction {
                class: None,
                confidence: None,
                annotated: Some(annotated),
            },
        );

        let diag = pipeline.run(&png_bytes(640, 640), Variant::Detector).unwrap();
        assert_eq!(diag.label, FALLBACK_LABEL);
        assert_eq!(diag.description, FALLBACK_DESCRIPTION);
        assert!(diag.confidence_pct.is_none());
        assert!(diag.annotated);
        assert!(pipeline.annotated_path().exists());
    }

    #[test]
    fn out_of_table_index_falls_back_instead_of_failing() {
        let pipeline = pipeline_with(
            Variant::Forest,
            Prediction {
                class: Some(9),
                confidence: Some(0.6),
                annotated: None,
            },
        );

        let diag = pipeline.run(&png_bytes(64, 64), Variant::Forest).unwrap();
        assert_eq!(diag.label, FALLBACK_LABEL);
        assert_eq!(diag.confidence_pct, Some(60.0));
    }

    #[test]
    fn confidence_is_clamped_into_percent_range() {
        let pipeline = pipeline_with(
            Variant::Classifier,
            Prediction {
                class: Some(1),
                confidence: Some(1.7),
                annotated: None,
            },
        );

        let diag = pipeline.run(&png_bytes(64, 64), Variant::Classifier).unwrap();
        assert_eq!(diag.confidence_pct, Some(100.0));
    }

    #[test]
    fn unavailable_variant_aborts_with_model_load() {
        let pipeline = pipeline_with(Variant::Classifier, Prediction::empty());
        let err = pipeline.run(&png_bytes(64, 64), Variant::Forest).unwrap_err();
        assert!(matches!(err, DermaError::ModelLoad(_)));
    }

    #[test]
    fn undecodable_upload_aborts_with_image_error() {
        let pipeline = pipeline_with(Variant::Classifier, Prediction::empty());
        let err = pipeline.run(&[1u8, 2, 3], Variant::Classifier).unwrap_err();
        assert!(matches!(
            err,
            DermaError::ImageDecode(_) | DermaError::UnsupportedFormat(_)
        ));
    }
}
