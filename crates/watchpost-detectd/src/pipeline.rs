use crate::config::Config;
use image::RgbImage;
use watchpost_core::labels::LabelError;
use watchpost_core::{LabelSet, LabeledBox, ObjectDetector, ObjectError, WeaponPolicy, YoloDetector};
use watchpost_service::engine::DEFAULT_QUEUE_DEPTH;
use watchpost_service::{spawn_engine, EngineHandle, Pipeline};

/// Runs the object detector on the engine thread.
pub struct ObjectPipeline {
    detector: Box<dyn ObjectDetector>,
}

impl ObjectPipeline {
    pub fn new(detector: Box<dyn ObjectDetector>) -> Self {
        Self { detector }
    }
}

impl Pipeline for ObjectPipeline {
    type Output = Vec<LabeledBox>;
    type Error = ObjectError;

    fn run(&mut self, image: RgbImage) -> Result<Self::Output, Self::Error> {
        self.detector.detect(&image)
    }
}

pub type ObjectEngine = EngineHandle<ObjectPipeline>;

/// Load the label set and YOLO model and start the engine thread.
///
/// Returns `None` when anything fails to load; the daemon keeps serving
/// and answers 503 to detection requests.
pub fn start(config: &Config, policy: &WeaponPolicy) -> Option<ObjectEngine> {
    let labels = match load_labels(config) {
        Ok(labels) => labels,
        Err(e) => {
            tracing::error!(error = %e, "error loading model");
            return None;
        }
    };

    for keyword in policy.uncovered_keywords(&labels) {
        tracing::warn!(
            keyword,
            labels = %labels.name,
            "weapon keyword matches no class label and will never fire"
        );
    }

    let path = config.yolo_path();
    let detector = match YoloDetector::load(&path, labels) {
        Ok(detector) => detector,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "error loading model");
            return None;
        }
    };

    match spawn_engine(
        "watchpost-detect",
        ObjectPipeline::new(Box::new(detector)),
        DEFAULT_QUEUE_DEPTH,
    ) {
        Ok(engine) => Some(engine),
        Err(e) => {
            tracing::error!(error = %e, "failed to spawn engine thread");
            None
        }
    }
}

fn load_labels(config: &Config) -> Result<LabelSet, LabelError> {
    match &config.labels_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading label set");
            LabelSet::from_file(path)
        }
        None => LabelSet::coco(),
    }
}
