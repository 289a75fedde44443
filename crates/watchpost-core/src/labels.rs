//! Class label sets for the object detector.
//!
//! A label set maps the detector's class indices to names. The COCO-80 set
//! used by stock YOLOv8 exports is embedded at compile time from
//! `contrib/labels/coco.toml`; fine-tuned models ship their own TOML file.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const COCO_LABELS: &str = include_str!("../../../contrib/labels/coco.toml");

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("cannot read label file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("bad label TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("label set {0:?} has no classes")]
    Empty(String),
}

/// Ordered class names; index `i` is the model's class `i`.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelSet {
    pub name: String,
    pub classes: Vec<String>,
}

impl LabelSet {
    /// The embedded COCO-80 label set.
    pub fn coco() -> Result<Self, LabelError> {
        Self::parse(COCO_LABELS)
    }

    /// Load a label set from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LabelError> {
        let src = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&src)
    }

    pub fn parse(src: &str) -> Result<Self, LabelError> {
        let set: LabelSet = toml::from_str(src)?;
        if set.classes.is_empty() {
            return Err(LabelError::Empty(set.name));
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Name for a class index, or `class_<id>` for indices outside the set.
    pub fn name(&self, class_id: usize) -> String {
        self.classes
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }
}
