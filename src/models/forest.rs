use crate::image::Preprocessor;
use crate::models::classifier::argmax;
use crate::models::{LesionModel, Prediction};
use crate::utils::error::DermaError;
use crate::{Config, Result};
use image::DynamicImage;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::sync::Arc;

const FOREST_INPUT_SIZE: u32 = 64;
const FOREST_FEATURES: usize = 12288; // 64 * 64 * 3

/// Random-forest lesion classifier over flattened 64x64 RGB pixels. Expects
/// a scikit-learn ONNX export with the ZipMap wrapper disabled, so the vote
/// distribution arrives as a plain `[1, classes]` probability tensor.
pub struct Forest {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl Forest {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = config.forest_model_path();

        if !model_path.exists() {
            return Err(DermaError::ModelLoad(format!(
                "Random-forest model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading random-forest model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.onnx_config.intra_threads)?
            .commit_from_file(&model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // sklearn exports emit a "label" tensor alongside the vote
        // distribution; prefer the probability output.
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| {
                DermaError::ModelLoad("Random-forest model has no outputs".to_string())
            })?;

        tracing::info!(
            "random-forest model io: input='{}' output='{}'",
            input_name,
            output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
        })
    }

    fn run_session(&self, features: Vec<f32>) -> Result<ndarray::ArrayD<f32>> {
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features))?;
        let mut session = self.session.lock();
        let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

        match outputs.get(&self.output_name) {
            Some(output) => Ok(output.try_extract_array::<f32>()?.into_owned()),
            None => {
                let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                Err(DermaError::Inference(format!(
                    "Output '{}' not found. Available outputs: {:?}",
                    self.output_name, available
                )))
            }
        }
    }
}

impl LesionModel for Forest {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        let resized = Preprocessor::resize(image, FOREST_INPUT_SIZE, FOREST_INPUT_SIZE);
        let features = Preprocessor::flatten_rgb(&resized);

        if features.len() != FOREST_FEATURES {
            return Err(DermaError::InvalidInput(format!(
                "Flattened feature vector has length {}, expected {}",
                features.len(),
                FOREST_FEATURES
            )));
        }

        let prediction = self.run_session(features)?;

        let probs: Vec<f32> = prediction.iter().copied().collect();
        if probs.is_empty() {
            return Err(DermaError::Inference(
                "Random-forest model produced an empty vote distribution".to_string(),
            ));
        }

        // Max class probability from the ensemble's vote distribution.
        let (class, confidence) = argmax(&probs);

        tracing::debug!("Forest vote: class={} confidence={:.3}", class, confidence);

        Ok(Prediction {
            class: Some(class),
            confidence: Some(confidence),
            annotated: None,
        })
    }
}
