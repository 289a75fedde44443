//! SCRFD face detector via ONNX Runtime.
//!
//! Implements the SCRFD (Sample and Computation Redistribution for Efficient Face
//! Detection) model with 3-stride anchor-free decoding and NMS post-processing.

use crate::geometry::{self, Rect};
use crate::preprocess::{self, Letterbox};
use crate::types::FaceBox;
use image::{Rgb, RgbImage};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
// Pads to ~SCRFD_MEAN so letterbox borders normalize to zero.
const SCRFD_PAD: Rgb<u8> = Rgb([128, 128, 128]);
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download det_10g.onnx from insightface and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Output tensor indices for one stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StrideOutputs {
    score: usize,
    bbox: usize,
    kps: usize,
}

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    /// One entry per stride in `SCRFD_STRIDES`.
    outputs: [StrideOutputs; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires 9 outputs (3 strides × score/bbox/kps), got {}",
                output_names.len()
            )));
        }

        let outputs = map_outputs(&output_names);
        tracing::debug!(?outputs, "SCRFD output tensor mapping");

        Ok(Self { session, outputs })
    }

    /// Detect faces, returning boxes in source pixels sorted by confidence.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, DetectorError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let letterbox = Letterbox::fit(width, height, SCRFD_INPUT_SIZE);
        let input = preprocess::to_nchw(&letterbox.apply(image, SCRFD_PAD), SCRFD_MEAN, SCRFD_STD);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (slot, &stride) in self.outputs.iter().zip(SCRFD_STRIDES.iter()) {
            let extract = |idx: usize, what: &'static str| {
                outputs[idx]
                    .try_extract_tensor::<f32>()
                    .map(|(_, data)| data)
                    .map_err(|e| DetectorError::InferenceFailed(format!("{what} stride {stride}: {e}")))
            };
            let scores = extract(slot.score, "scores")?;
            let bboxes = extract(slot.bbox, "bboxes")?;
            let kps = extract(slot.kps, "kps")?;

            candidates.extend(decode_stride(scores, bboxes, kps, stride, &letterbox));
        }

        let faces = geometry::non_max_suppression(candidates, SCRFD_NMS_THRESHOLD);
        tracing::debug!(count = faces.len(), "SCRFD detections");
        Ok(faces)
    }
}

/// Discover output tensor ordering by name.
///
/// Some exports name their tensors `score_8`, `bbox_16`, `kps_32`, ...; others
/// use bare integers, in which case the standard positional layout applies:
/// `[0-2]` scores, `[3-5]` bboxes, `[6-8]` keypoints, strides ascending.
fn map_outputs(names: &[String]) -> [StrideOutputs; 3] {
    let find = |prefix: &str, stride: usize| {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == target)
    };

    let by_name: Option<Vec<StrideOutputs>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| {
            Some(StrideOutputs {
                score: find("score", stride)?,
                bbox: find("bbox", stride)?,
                kps: find("kps", stride)?,
            })
        })
        .collect();

    match by_name {
        Some(found) => {
            tracing::info!("SCRFD: using name-based output tensor mapping");
            [found[0], found[1], found[2]]
        }
        None => {
            tracing::info!(?names, "SCRFD: output names not recognized, using positional mapping");
            std::array::from_fn(|i| StrideOutputs {
                score: i,
                bbox: i + 3,
                kps: i + 6,
            })
        }
    }
}

/// Decode the candidates of one stride level above the confidence threshold.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    kps: &[f32],
    stride: usize,
    letterbox: &Letterbox,
) -> Vec<FaceBox> {
    // Square input, so the grid is square too.
    let grid = letterbox.target as usize / stride;
    let anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
    let step = stride as f32;

    (0..anchors.min(scores.len()))
        .filter(|&idx| scores[idx] > SCRFD_CONFIDENCE_THRESHOLD)
        .filter_map(|idx| {
            let cell = idx / SCRFD_ANCHORS_PER_CELL;
            let cx = (cell % grid) as f32 * step;
            let cy = (cell / grid) as f32 * step;

            // Distances from the anchor center to each edge, in strides.
            let d = bboxes.get(idx * 4..idx * 4 + 4)?;
            let (x1, y1) = letterbox.to_source(cx - d[0] * step, cy - d[1] * step);
            let (x2, y2) = letterbox.to_source(cx + d[2] * step, cy + d[3] * step);

            let landmarks = kps.get(idx * 10..idx * 10 + 10).map(|k| {
                std::array::from_fn(|i| {
                    letterbox.to_source(cx + k[i * 2] * step, cy + k[i * 2 + 1] * step)
                })
            });

            Some(FaceBox {
                rect: Rect::new(x1, y1, x2, y2),
                confidence: scores[idx],
                landmarks,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(score: usize, bbox: usize, kps: usize) -> StrideOutputs {
        StrideOutputs {
            score,
            bbox,
            kps,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_map_outputs_named() {
        let outputs = map_outputs(&names(&[
            "score_8", "score_16", "score_32",
            "bbox_8", "bbox_16", "bbox_32",
            "kps_8", "kps_16", "kps_32",
        ]));
        assert_eq!(outputs[0], slots(0, 3, 6));
        assert_eq!(outputs[2], slots(2, 5, 8));
    }

    #[test]
    fn test_map_outputs_shuffled_named() {
        let outputs = map_outputs(&names(&[
            "bbox_8", "kps_8", "score_8",
            "bbox_16", "kps_16", "score_16",
            "bbox_32", "kps_32", "score_32",
        ]));
        assert_eq!(outputs[0], slots(2, 0, 1));
        assert_eq!(outputs[1], slots(5, 3, 4));
        assert_eq!(outputs[2], slots(8, 6, 7));
    }

    #[test]
    fn test_map_outputs_positional_fallback() {
        let generic: Vec<String> = (0..9).map(|i: usize| (448 + i).to_string()).collect();
        let outputs = map_outputs(&generic);
        assert_eq!(outputs[1], slots(1, 4, 7));
    }

    #[test]
    fn test_decode_stride_single_face() {
        // Identity letterbox: a 640x640 source.
        let letterbox = Letterbox::fit(640, 640, SCRFD_INPUT_SIZE);
        let stride = 32;
        let anchors = (640 / stride) * (640 / stride) * SCRFD_ANCHORS_PER_CELL;

        let mut scores = vec![0.0f32; anchors];
        let mut bboxes = vec![0.0f32; anchors * 4];
        let kps = vec![0.5f32; anchors * 10];

        // Anchor 2 -> cell 1 -> center (32, 0).
        scores[2] = 0.9;
        bboxes[8..12].copy_from_slice(&[0.5, 0.0, 1.0, 2.0]);

        let faces = decode_stride(&scores, &bboxes, &kps, stride, &letterbox);
        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert_eq!(face.rect, Rect::new(16.0, 0.0, 64.0, 64.0));
        assert!((face.confidence - 0.9).abs() < 1e-6);
        assert_eq!(face.landmarks.map(|l| l[0]), Some((48.0, 16.0)));
    }

    #[test]
    fn test_decode_stride_threshold() {
        let letterbox = Letterbox::fit(640, 640, SCRFD_INPUT_SIZE);
        let anchors = 20 * 20 * SCRFD_ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; anchors];
        scores[0] = SCRFD_CONFIDENCE_THRESHOLD;
        let faces = decode_stride(&scores, &vec![0.0; anchors * 4], &[], 32, &letterbox);
        assert!(faces.is_empty());
    }

    #[test]
    fn test_decode_stride_missing_landmarks() {
        let letterbox = Letterbox::fit(640, 640, SCRFD_INPUT_SIZE);
        let anchors = 20 * 20 * SCRFD_ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; anchors];
        scores[0] = 0.8;
        let faces = decode_stride(&scores, &vec![1.0; anchors * 4], &[], 32, &letterbox);
        assert_eq!(faces.len(), 1);
        assert!(faces[0].landmarks.is_none());
    }
}
