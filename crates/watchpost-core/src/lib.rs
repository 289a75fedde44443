//! watchpost-core — Object detection and face recognition engine.
//!
//! Uses YOLOv8 for general object detection, SCRFD for face detection and
//! ArcFace for face embeddings, all running via ONNX Runtime on the CPU.

pub mod alignment;
pub mod detector;
pub mod faces;
pub mod frame;
pub mod geometry;
pub mod labels;
pub mod objects;
pub mod preprocess;
pub mod recognizer;
pub mod registry;
pub mod types;
pub mod weapons;

use std::path::PathBuf;

pub use detector::FaceDetector;
pub use faces::{FaceEncoder, FaceError, OnnxFaceEncoder};
pub use geometry::Rect;
pub use labels::LabelSet;
pub use objects::{ObjectDetector, ObjectError, YoloDetector};
pub use recognizer::FaceRecognizer;
pub use registry::SuspectRegistry;
pub use types::{
    DistanceMatcher, DistanceMetric, Embedding, FaceBox, LabeledBox, SuspectMatch,
};
pub use weapons::{Detection, DetectionReport, WeaponPolicy};

/// Default directory holding the ONNX model files.
///
/// `$XDG_DATA_HOME/watchpost/models`, falling back to
/// `~/.local/share/watchpost/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("watchpost")
        .join("models")
}
