//! Weapon flagging over general-purpose detector output.
//!
//! Flagging is name-based: a detection is a weapon when its class label
//! contains one of the configured keywords. Stock COCO models only carry
//! "knife"; there is no firearm class, so "gun" never fires unless a
//! custom label set provides one.

use crate::geometry::Rect;
use crate::labels::LabelSet;
use crate::types::LabeledBox;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEAPON_KEYWORDS: [&str; 3] = ["knife", "gun", "weapon"];
pub const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.5;

/// One entry of the `/detect` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: Rect,
    pub is_weapon: bool,
}

/// Filtered detections plus the number flagged as weapons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub detections: Vec<Detection>,
    pub weapons_detected: usize,
}

#[derive(Debug, Clone)]
pub struct WeaponPolicy {
    /// Lowercase substrings that mark a label as a weapon.
    keywords: Vec<String>,
    /// Non-weapon detections must score strictly above this.
    confidence_floor: f32,
}

impl Default for WeaponPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WEAPON_KEYWORDS, DEFAULT_CONFIDENCE_FLOOR)
    }
}

impl WeaponPolicy {
    pub fn new<I, S>(keywords: I, confidence_floor: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            confidence_floor,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn confidence_floor(&self) -> f32 {
        self.confidence_floor
    }

    /// Case-insensitive keyword containment.
    pub fn is_weapon(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.keywords.iter().any(|k| label.contains(k.as_str()))
    }

    /// Keep weapons regardless of score and everything else above the floor.
    pub fn apply(&self, boxes: Vec<LabeledBox>) -> DetectionReport {
        let detections: Vec<Detection> = boxes
            .into_iter()
            .filter_map(|b| {
                let is_weapon = self.is_weapon(&b.label);
                (is_weapon || b.confidence > self.confidence_floor).then(|| Detection {
                    label: b.label,
                    confidence: b.confidence,
                    bbox: b.rect,
                    is_weapon,
                })
            })
            .collect();

        let weapons_detected = detections.iter().filter(|d| d.is_weapon).count();
        DetectionReport {
            detections,
            weapons_detected,
        }
    }

    /// Keywords that no class in `labels` can ever match.
    pub fn uncovered_keywords<'a>(&'a self, labels: &LabelSet) -> Vec<&'a str> {
        self.keywords
            .iter()
            .filter(|k| {
                !labels
                    .classes
                    .iter()
                    .any(|c| c.to_lowercase().contains(k.as_str()))
            })
            .map(String::as_str)
            .collect()
    }
}
