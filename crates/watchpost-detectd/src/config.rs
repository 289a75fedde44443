use std::path::PathBuf;
use watchpost_core::weapons::{DEFAULT_CONFIDENCE_FLOOR, DEFAULT_WEAPON_KEYWORDS};
use watchpost_core::WeaponPolicy;
use watchpost_service::config::{env_parse, env_string, split_list};
use watchpost_service::ServerConfig;

pub const DEFAULT_PORT: u16 = 8001;

/// Detection daemon configuration, loaded from environment variables.
pub struct Config {
    pub server: ServerConfig,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// YOLO model filename within `model_dir`.
    pub yolo_model: String,
    /// Class-name table override; the embedded COCO-80 table when unset.
    pub labels_path: Option<PathBuf>,
    /// Non-weapon detections must score strictly above this.
    pub confidence_floor: f32,
    pub weapon_keywords: Vec<String>,
}

impl Config {
    /// Load configuration from `WATCHPOST_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("WATCHPOST_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| watchpost_core::default_model_dir());

        Self {
            server: ServerConfig::from_env("WATCHPOST_DETECT", DEFAULT_PORT),
            model_dir,
            yolo_model: env_string("WATCHPOST_YOLO_MODEL", "yolov8n.onnx"),
            labels_path: std::env::var("WATCHPOST_LABELS_PATH").ok().map(PathBuf::from),
            confidence_floor: env_parse("WATCHPOST_CONFIDENCE_FLOOR", DEFAULT_CONFIDENCE_FLOOR),
            weapon_keywords: std::env::var("WATCHPOST_WEAPON_KEYWORDS")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|_| DEFAULT_WEAPON_KEYWORDS.map(String::from).to_vec()),
        }
    }

    /// Path to the YOLO detection model.
    pub fn yolo_path(&self) -> PathBuf {
        self.model_dir.join(&self.yolo_model)
    }

    pub fn policy(&self) -> WeaponPolicy {
        WeaponPolicy::new(&self.weapon_keywords, self.confidence_floor)
    }
}
