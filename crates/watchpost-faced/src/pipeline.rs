use crate::config::Config;
use image::RgbImage;
use watchpost_core::{Embedding, FaceEncoder, FaceError, OnnxFaceEncoder};
use watchpost_service::engine::DEFAULT_QUEUE_DEPTH;
use watchpost_service::{spawn_engine, EngineHandle, Pipeline};

/// Faces found in one image and the embeddings that could be extracted.
#[derive(Debug, Clone, Default)]
pub struct FaceAnalysis {
    pub faces_detected: usize,
    /// In face order; may be shorter than `faces_detected`.
    pub embeddings: Vec<Embedding>,
}

impl FaceAnalysis {
    /// Only the first embedding is ever used; additional faces are ignored.
    pub fn first_embedding(&self) -> Option<&Embedding> {
        self.embeddings.first()
    }
}

/// Locates and encodes faces on the engine thread.
pub struct FacePipeline {
    encoder: Box<dyn FaceEncoder>,
}

impl FacePipeline {
    pub fn new(encoder: Box<dyn FaceEncoder>) -> Self {
        Self { encoder }
    }
}

impl Pipeline for FacePipeline {
    type Output = FaceAnalysis;
    type Error = FaceError;

    fn run(&mut self, image: RgbImage) -> Result<Self::Output, Self::Error> {
        let faces = self.encoder.locate(&image)?;
        if faces.is_empty() {
            return Ok(FaceAnalysis::default());
        }
        let embeddings = self.encoder.encode(&image, &faces)?;
        Ok(FaceAnalysis {
            faces_detected: faces.len(),
            embeddings,
        })
    }
}

pub type FaceEngine = EngineHandle<FacePipeline>;

/// Load SCRFD and ArcFace and start the engine thread.
///
/// Returns `None` when either model fails to load; the daemon keeps
/// serving and answers 503 to match and registration requests.
pub fn start(config: &Config) -> Option<FaceEngine> {
    let (scrfd, arcface) = (config.scrfd_path(), config.arcface_path());
    let encoder = match OnnxFaceEncoder::load(&scrfd, &arcface) {
        Ok(encoder) => encoder,
        Err(e) => {
            tracing::error!(
                scrfd = %scrfd.display(),
                arcface = %arcface.display(),
                error = %e,
                "error loading model"
            );
            return None;
        }
    };
    tracing::info!("SCRFD detector and ArcFace recognizer loaded");

    match spawn_engine(
        "watchpost-face",
        FacePipeline::new(Box::new(encoder)),
        DEFAULT_QUEUE_DEPTH,
    ) {
        Ok(engine) => Some(engine),
        Err(e) => {
            tracing::error!(error = %e, "failed to spawn engine thread");
            None
        }
    }
}
