use crate::image::Preprocessor;
use crate::models::{LesionModel, Prediction};
use crate::utils::error::DermaError;
use crate::{Config, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use ndarray::{Array3, ArrayView2, Axis, s};
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::sync::Arc;

const DETECTOR_INPUT_SIZE: u32 = 640;
const CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Single accepted detection in model-input coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class: usize,
    pub confidence: f32,
    /// Center-x, center-y, width, height
    pub bbox: [f32; 4],
}

/// YOLO-style lesion detector. Returns the highest-confidence detection and
/// an annotated copy of the model input; no detection above threshold is a
/// valid empty result.
pub struct Detector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    class_names: Vec<String>,
}

impl Detector {
    pub fn new(config: &Config, class_names: Vec<String>) -> Result<Self> {
        let model_path = config.detector_model_path();

        if !model_path.exists() {
            return Err(DermaError::ModelLoad(format!(
                "Detection model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading detection model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.onnx_config.intra_threads)?
            .commit_from_file(&model_path)?;

        let (input_name, output_name) = discover_io_names(&session, "detection")?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            class_names,
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

impl LesionModel for Detector {
    fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        let resized = Preprocessor::resize(image, DETECTOR_INPUT_SIZE, DETECTOR_INPUT_SIZE);
        let tensor = Preprocessor::to_chw_tensor(&resized);

        let prediction = self.run_session(tensor)?;

        let shape = prediction.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(DermaError::InvalidInput(format!(
                "Unexpected detection output shape: {:?}, expected [1, 4+classes, anchors]",
                shape
            )));
        }

        let best = best_detection(
            &prediction.slice(s![0, .., ..]),
            self.class_names.len(),
            CONFIDENCE_THRESHOLD,
        );

        match best {
            Some(det) => {
                let name = self
                    .class_names
                    .get(det.class)
                    .map(|s| s.as_str())
                    .unwrap_or("?");
                tracing::debug!(
                    "Detection: class={} ({}) confidence={:.3}",
                    det.class,
                    name,
                    det.confidence
                );
                let mut annotated = resized;
                draw_detection(&mut annotated, &det);
                Ok(Prediction {
                    class: Some(det.class),
                    confidence: Some(det.confidence),
                    annotated: Some(annotated),
                })
            }
            None => {
                tracing::debug!("No detection above threshold {}", CONFIDENCE_THRESHOLD);
                Ok(Prediction {
                    annotated: Some(resized),
                    ..Prediction::empty()
                })
            }
        }
    }
}

/// Discover input/output tensor names instead of hard-coding exporter
/// defaults; different training pipelines name them differently.
pub(crate) fn discover_io_names(session: &Session, kind: &str) -> Result<(String, String)> {
    let input_name = session
        .inputs
        .first()
        .map(|i| i.name.clone())
        .ok_or_else(|| DermaError::ModelLoad(format!("{} model has no inputs", kind)))?;

    let output_name = session
        .outputs
        .first()
        .map(|o| o.name.clone())
        .ok_or_else(|| DermaError::ModelLoad(format!("{} model has no outputs", kind)))?;

    tracing::info!(
        "{} model io: input='{}' output='{}'",
        kind,
        input_name,
        output_name
    );
    for (i, output) in session.outputs.iter().enumerate() {
        tracing::debug!("{} output[{}]: '{}'", kind, i, output.name);
    }

    Ok((input_name, output_name))
}

/// Scan a `(4+classes, anchors)` YOLOv8-layout prediction map and keep the
/// single highest-confidence detection above `threshold`.
pub fn best_detection(
    pred: &ArrayView2<f32>,
    num_classes: usize,
    threshold: f32,
) -> Option<Detection> {
    let (rows, anchors) = pred.dim();
    if rows < 5 {
        return None;
    }
    // Trust the tensor over the caller when the label table is narrower
    // than the exported head.
    let num_classes = num_classes.min(rows - 4).max(1);

    let mut best: Option<Detection> = None;

    for j in 0..anchors {
        let mut class = 0;
        let mut score = f32::NEG_INFINITY;
        for c in 0..num_classes {
            let v = pred[[4 + c, j]];
            if v > score {
                score = v;
                class = c;
            }
        }

        if score < threshold {
            continue;
        }

        if best.map_or(true, |b| score > b.confidence) {
            best = Some(Detection {
                class,
                confidence: score,
                bbox: [pred[[0, j]], pred[[1, j]], pred[[2, j]], pred[[3, j]]],
            });
        }
    }

    best
}

/// Draw the accepted bounding box onto the model-input raster.
fn draw_detection(image: &mut RgbImage, det: &Detection) {
    let (w, h) = image.dimensions();
    let [cx, cy, bw, bh] = det.bbox;

    let x0 = (cx - bw / 2.0).clamp(0.0, w as f32 - 1.0) as i32;
    let y0 = (cy - bh / 2.0).clamp(0.0, h as f32 - 1.0) as i32;
    let box_w = bw.clamp(1.0, w as f32).round() as u32;
    let box_h = bh.clamp(1.0, h as f32).round() as u32;

    let color = Rgb([237, 28, 36]);
    for inset in 0..3i32 {
        let rect = Rect::at(x0 + inset, y0 + inset).of_size(
            box_w.saturating_sub(2 * inset as u32).max(1),
            box_h.saturating_sub(2 * inset as u32).max(1),
        );
        draw_hollow_rect_mut(image, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn pred_map(anchors: usize, num_classes: usize) -> Array2<f32> {
        Array2::<f32>::zeros((4 + num_classes, anchors))
    }

    #[test]
    fn all_zero_map_has_no_detection() {
        let pred = pred_map(100, 4);
        assert_eq!(best_detection(&pred.view(), 4, 0.25), None);
    }

    #[test]
    fn scores_below_threshold_are_rejected() {
        let mut pred = pred_map(10, 4);
        pred[[4, 3]] = 0.24;
        assert_eq!(best_detection(&pred.view(), 4, 0.25), None);
    }

    #[test]
    fn highest_confidence_anchor_wins() {
        let mut pred = pred_map(10, 4);
        // anchor 2: class 1 at 0.6
        pred[[5, 2]] = 0.6;
        pred[[0, 2]] = 320.0;
        pred[[1, 2]] = 320.0;
        pred[[2, 2]] = 100.0;
        pred[[3, 2]] = 80.0;
        // anchor 7: class 3 at 0.9
        pred[[7, 7]] = 0.9;

        let det = best_detection(&pred.view(), 4, 0.25).unwrap();
        assert_eq!(det.class, 3);
        assert!((det.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn annotation_marks_the_box_edge() {
        let mut img = RgbImage::new(640, 640);
        let det = Detection {
            class: 0,
            confidence: 0.8,
            bbox: [320.0, 320.0, 100.0, 100.0],
        };
        draw_detection(&mut img, &det);
        assert_eq!(*img.get_pixel(270, 320), Rgb([237, 28, 36]));
        assert_eq!(*img.get_pixel(10, 10), Rgb([0, 0, 0]));
    }
}
