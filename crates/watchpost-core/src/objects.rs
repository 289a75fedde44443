//! YOLOv8 object detector via ONNX Runtime.
//!
//! Expects an Ultralytics ONNX export: one `[1, 3, 640, 640]` RGB input in
//! `[0, 1]` and one `[1, 4 + C, N]` output holding `cx, cy, w, h` followed by
//! `C` class scores for each of `N` candidates. Post-processing follows the
//! Ultralytics defaults: per-candidate best class, confidence 0.25,
//! class-aware NMS at IoU 0.7, at most 300 detections.

use crate::geometry::{self, Rect};
use crate::labels::LabelSet;
use crate::preprocess::{self, Letterbox};
use crate::types::LabeledBox;
use image::{Rgb, RgbImage};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const YOLO_INPUT_SIZE: u32 = 640;
const YOLO_PAD: Rgb<u8> = Rgb([114, 114, 114]);
const YOLO_CONFIDENCE_THRESHOLD: f32 = 0.25;
const YOLO_NMS_THRESHOLD: f32 = 0.7;
const YOLO_MAX_DETECTIONS: usize = 300;
const YOLO_BOX_CHANNELS: usize = 4;

#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("model file not found: {0} — export yolov8n.onnx with Ultralytics and place it in the model directory")]
    ModelNotFound(String),
    #[error("unexpected model output: {0}")]
    BadOutput(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Produces labeled boxes for an RGB image.
///
/// Implementations are driven from a single engine thread, so they may
/// hold mutable inference sessions.
pub trait ObjectDetector: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<LabeledBox>, ObjectError>;
}

/// YOLOv8-based object detector.
pub struct YoloDetector {
    session: Session,
    labels: LabelSet,
}

impl YoloDetector {
    /// Load a YOLOv8 ONNX export whose classes are described by `labels`.
    pub fn load(model_path: &Path, labels: LabelSet) -> Result<Self, ObjectError> {
        if !model_path.exists() {
            return Err(ObjectError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(4)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            labels = %labels.name,
            classes = labels.len(),
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded YOLO model"
        );

        Ok(Self { session, labels })
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<LabeledBox>, ObjectError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let letterbox = Letterbox::fit(width, height, YOLO_INPUT_SIZE);
        let input = preprocess::to_nchw(&letterbox.apply(image, YOLO_PAD), 0.0, 255.0);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ObjectError::InferenceFailed(format!("predictions: {e}")))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let layout = OutputLayout::from_dims(&dims, self.labels.len())?;

        let candidates = decode_predictions(
            data,
            layout,
            &self.labels,
            &letterbox,
            (width as f32, height as f32),
        );

        let mut kept = geometry::non_max_suppression(candidates, YOLO_NMS_THRESHOLD);
        kept.truncate(YOLO_MAX_DETECTIONS);
        tracing::debug!(count = kept.len(), "YOLO detections");
        Ok(kept)
    }
}

/// Shape of the `[1, 4 + C, N]` prediction tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutputLayout {
    classes: usize,
    candidates: usize,
}

impl OutputLayout {
    fn from_dims(dims: &[i64], expected_classes: usize) -> Result<Self, ObjectError> {
        let [1, channels, candidates] = dims else {
            return Err(ObjectError::BadOutput(format!("expected [1, 4+C, N], got {dims:?}")));
        };

        let (Ok(channels), Ok(candidates)) =
            (usize::try_from(*channels), usize::try_from(*candidates))
        else {
            return Err(ObjectError::BadOutput(format!("negative dimension in {dims:?}")));
        };

        let classes = channels.saturating_sub(YOLO_BOX_CHANNELS);
        if classes != expected_classes {
            return Err(ObjectError::BadOutput(format!(
                "model predicts {classes} classes but the label set has {expected_classes}"
            )));
        }

        Ok(Self {
            classes,
            candidates,
        })
    }
}

/// Turn the channel-major prediction tensor into labeled boxes in source
/// pixels, keeping candidates whose best class scores above the threshold.
fn decode_predictions(
    data: &[f32],
    layout: OutputLayout,
    labels: &LabelSet,
    letterbox: &Letterbox,
    (image_width, image_height): (f32, f32),
) -> Vec<LabeledBox> {
    let n = layout.candidates;
    let expected = (YOLO_BOX_CHANNELS + layout.classes).checked_mul(n);
    if expected.map_or(true, |len| data.len() < len) {
        tracing::warn!(len = data.len(), ?layout, "YOLO output shorter than its shape");
        return Vec::new();
    }
    let at = |channel: usize, i: usize| data[channel * n + i];

    (0..n)
        .filter_map(|i| {
            let (class_id, confidence) = (0..layout.classes)
                .map(|c| (c, at(YOLO_BOX_CHANNELS + c, i)))
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            if confidence <= YOLO_CONFIDENCE_THRESHOLD {
                return None;
            }

            let boxed = Rect::from_center(at(0, i), at(1, i), at(2, i), at(3, i));
            let (x1, y1) = letterbox.to_source(boxed.x1, boxed.y1);
            let (x2, y2) = letterbox.to_source(boxed.x2, boxed.y2);

            Some(LabeledBox {
                class_id,
                label: labels.name(class_id),
                confidence,
                rect: Rect::new(x1, y1, x2, y2).clamp_to(image_width, image_height),
            })
        })
        .collect()
}
