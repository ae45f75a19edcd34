use crate::image::Preprocessor;
use crate::models::detector::discover_io_names;
use crate::models::{LesionModel, Prediction};
use crate::utils::error::DermaError;
use crate::{Config, Result};
use image::DynamicImage;
use ndarray::{Array3, Axis};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::sync::Arc;

const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// CNN lesion classifier: 224x224 [0,1] CHW input, arg-max over the class
/// probability vector.
pub struct Classifier {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl Classifier {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = config.classifier_model_path();

        if !model_path.exists() {
            return Err(DermaError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.onnx_config.intra_threads)?
            .commit_from_file(&model_path)?;

        let (input_name, output_name) = discover_io_names(&session, "classification")?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
        })
    }

    fn run_session(&self, input: Array3<f32>) -> Result<ndarray::ArrayD<f32>> {
        let input_tensor = Tensor::from_array(input.insert_axis(Axis(0)))?;
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

impl LesionModel for Classifier {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        let resized = Preprocessor::resize(image, CLASSIFIER_INPUT_SIZE, CLASSIFIER_INPUT_SIZE);
        let tensor = Preprocessor::to_chw_tensor(&resized);

        let prediction = self.run_session(tensor)?;

        let shape = prediction.shape().to_vec();
        if shape.len() != 2 || shape[0] != 1 || shape[1] == 0 {
            return Err(DermaError::InvalidInput(format!(
                "Unexpected classification output shape: {:?}, expected [1, classes]",
                shape
            )));
        }

        let scores: Vec<f32> = prediction.iter().copied().collect();
        let probs = to_probabilities(&scores);
        let (class, confidence) = argmax(&probs);

        tracing::debug!("Classification: class={} confidence={:.3}", class, confidence);

        Ok(Prediction {
            class: Some(class),
            confidence: Some(confidence),
            annotated: None,
        })
    }
}

/// Networks are exported with or without a softmax head; apply one only when
/// the scores are not already a probability distribution.
pub fn to_probabilities(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let in_range = scores.iter().all(|&v| (0.0..=1.0).contains(&v));
    if in_range && (sum - 1.0).abs() < 1e-3 {
        return scores.to_vec();
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&v| (v - max).exp()).collect();
    let denom: f32 = exps.iter().sum();
    exps.iter().map(|&e| e / denom).collect()
}

/// Index and value of the largest probability.
pub fn argmax(probs: &[f32]) -> (usize, f32) {
    let mut best_idx = 0;
    let mut best = f32::NEG_INFINITY;
    for (i, &p) in probs.iter().enumerate() {
        if p > best {
            best = p;
            best_idx = i;
        }
    }
    (best_idx, best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_vectors_pass_through_unchanged() {
        let probs = vec![0.05, 0.83, 0.02, 0.10];
        assert_eq!(to_probabilities(&probs), probs);
    }

    #[test]
    fn logits_are_softmaxed() {
        let probs = to_probabilities(&[2.0, 1.0, -1.0, 0.5]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1] && probs[1] > probs[3] && probs[3] > probs[2]);
    }

    #[test]
    fn argmax_picks_top_class_with_its_probability() {
        let (idx, p) = argmax(&[0.05, 0.83, 0.02, 0.10]);
        assert_eq!(idx, 1);
        assert!((p - 0.83).abs() < 1e-6);
    }
}
