use std::path::PathBuf;
use watchpost_core::{DistanceMatcher, DistanceMetric};
use watchpost_service::config::{env_parse, env_string};
use watchpost_service::ServerConfig;

pub const DEFAULT_PORT: u16 = 8000;

/// Face-match daemon configuration, loaded from environment variables.
pub struct Config {
    pub server: ServerConfig,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// SCRFD model filename within `model_dir`.
    pub scrfd_model: String,
    /// ArcFace model filename within `model_dir`.
    pub arcface_model: String,
    /// Matches must score strictly above this confidence (`1 - distance`).
    pub match_threshold: f32,
    pub max_matches: usize,
    pub metric: DistanceMetric,
}

impl Config {
    /// Load configuration from `WATCHPOST_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("WATCHPOST_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| watchpost_core::default_model_dir());
        let defaults = DistanceMatcher::default();

        Self {
            server: ServerConfig::from_env("WATCHPOST_FACE", DEFAULT_PORT),
            model_dir,
            scrfd_model: env_string("WATCHPOST_SCRFD_MODEL", "det_10g.onnx"),
            arcface_model: env_string("WATCHPOST_ARCFACE_MODEL", "w600k_r50.onnx"),
            match_threshold: env_parse("WATCHPOST_MATCH_THRESHOLD", defaults.min_confidence),
            max_matches: env_parse("WATCHPOST_MAX_MATCHES", defaults.max_results),
            metric: env_parse("WATCHPOST_MATCH_METRIC", defaults.metric),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_path(&self) -> PathBuf {
        self.model_dir.join(&self.scrfd_model)
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_path(&self) -> PathBuf {
        self.model_dir.join(&self.arcface_model)
    }

    pub fn matcher(&self) -> DistanceMatcher {
        DistanceMatcher {
            metric: self.metric,
            min_confidence: self.match_threshold,
            max_results: self.max_matches,
        }
    }
}
