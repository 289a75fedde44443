//! Face location and encoding pipeline.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{Embedding, FaceBox};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Locates faces in an image and turns them into embeddings.
///
/// Implementations are driven from a single engine thread, so they may
/// hold mutable inference sessions.
pub trait FaceEncoder: Send {
    /// Locate faces, most confident first.
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, FaceError>;

    /// Embed each located face. Faces that cannot be embedded are skipped,
    /// so the result may be shorter than `faces`.
    fn encode(&mut self, image: &RgbImage, faces: &[FaceBox]) -> Result<Vec<Embedding>, FaceError>;
}

/// SCRFD + ArcFace encoder.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    pub fn load(detector_path: &Path, recognizer_path: &Path) -> Result<Self, FaceError> {
        let detector = FaceDetector::load(detector_path)?;
        let recognizer = FaceRecognizer::load(recognizer_path)?;
        Ok(Self {
            detector,
            recognizer,
        })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, FaceError> {
        Ok(self.detector.detect(image)?)
    }

    fn encode(&mut self, image: &RgbImage, faces: &[FaceBox]) -> Result<Vec<Embedding>, FaceError> {
        let mut embeddings = Vec::with_capacity(faces.len());
        for face in faces {
            match self.recognizer.extract(image, face) {
                Ok(embedding) => embeddings.push(embedding),
                Err(RecognizerError::NoLandmarks) => {
                    tracing::debug!(confidence = face.confidence, "skipping face without landmarks");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(embeddings)
    }
}
