use crate::geometry::{Rect, Scored};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// A detected face, with optional five-point landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub rect: Rect,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl Scored for FaceBox {
    fn rect(&self) -> &Rect {
        &self.rect
    }

    fn score(&self) -> f32 {
        self.confidence
    }
}

/// Raw object detector output, before the weapon policy is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledBox {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub rect: Rect,
}

impl Scored for LabeledBox {
    fn rect(&self) -> &Rect {
        &self.rect
    }

    fn score(&self) -> f32 {
        self.confidence
    }

    fn competes_with(&self, other: &Self) -> bool {
        self.class_id == other.class_id
    }
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Cosine similarity in [-1, 1]. Zero when either vector is all zeros.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Euclidean (L2) distance.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// How two embeddings are turned into a distance.
///
/// ArcFace embeddings are unit length, where L2 distance is
/// `sqrt(2 - 2 * cos)`; a 0.6 confidence floor under `Euclidean` would
/// demand cosine similarity above 0.92. `Cosine` makes confidence equal to
/// the similarity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// L2 distance, the `face_distance` convention for dlib encodings.
    Euclidean,
    /// `1 - cosine similarity`.
    #[default]
    Cosine,
}

impl DistanceMetric {
    pub fn distance(&self, a: &Embedding, b: &Embedding) -> f32 {
        match self {
            Self::Euclidean => a.euclidean_distance(b),
            Self::Cosine => 1.0 - a.similarity(b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "cosine" => Ok(Self::Cosine),
            other => Err(format!("unknown distance metric: {other}")),
        }
    }
}

/// One ranked suspect for a probe face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspectMatch {
    pub suspect_id: String,
    /// `1 - distance`.
    pub confidence: f32,
    pub distance: f32,
}

/// Ranks a gallery of suspects against a probe embedding.
///
/// Every gallery entry is scored; entries with `confidence > min_confidence`
/// are kept, sorted by descending confidence and truncated to `max_results`.
#[derive(Debug, Clone)]
pub struct DistanceMatcher {
    pub metric: DistanceMetric,
    pub min_confidence: f32,
    pub max_results: usize,
}

impl Default for DistanceMatcher {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::default(),
            min_confidence: 0.6,
            max_results: 10,
        }
    }
}

impl DistanceMatcher {
    pub fn rank<'a, I>(&self, probe: &Embedding, gallery: I) -> Vec<SuspectMatch>
    where
        I: IntoIterator<Item = (&'a String, &'a Embedding)>,
    {
        let mut matches: Vec<SuspectMatch> = gallery
            .into_iter()
            .filter_map(|(suspect_id, embedding)| {
                let distance = self.metric.distance(probe, embedding);
                let confidence = 1.0 - distance;
                (confidence > self.min_confidence).then(|| SuspectMatch {
                    suspect_id: suspect_id.clone(),
                    confidence,
                    distance,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        matches.truncate(self.max_results);
        matches
    }
}
