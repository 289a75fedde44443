//! Axis-aligned boxes and non-maximum suppression.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Axis-aligned rectangle in corner form, in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a center point and size (YOLO `cxcywh` layout).
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamp all corners into `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: f32, height: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
        }
    }

    /// Intersection-over-Union with another rectangle.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = Rect {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        }
        .area();

        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// A scored candidate box that can take part in NMS.
pub trait Scored {
    fn rect(&self) -> &Rect;
    fn score(&self) -> f32;

    /// Whether `self` may suppress `other`. Class-aware detectors only let
    /// boxes of the same class compete.
    fn competes_with(&self, _other: &Self) -> bool {
        true
    }
}

/// Sort by descending score, highest first. NaN scores sort last.
pub fn sort_by_score<T: Scored>(items: &mut [T]) {
    items.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(Ordering::Equal)
    });
}

/// Greedy non-maximum suppression.
///
/// Returns the surviving candidates sorted by descending score.
pub fn non_max_suppression<T: Scored>(mut items: Vec<T>, iou_threshold: f32) -> Vec<T> {
    sort_by_score(&mut items);

    let mut keep: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let suppressed = keep
            .iter()
            .any(|k| k.competes_with(&item) && k.rect().iou(item.rect()) > iou_threshold);
        if !suppressed {
            keep.push(item);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cand {
        rect: Rect,
        score: f32,
        class: usize,
    }

    impl Scored for Cand {
        fn rect(&self) -> &Rect {
            &self.rect
        }
        fn score(&self) -> f32 {
            self.score
        }
        fn competes_with(&self, other: &Self) -> bool {
            self.class == other.class
        }
    }

    fn cand(x: f32, y: f32, w: f32, h: f32, score: f32, class: usize) -> Cand {
        Cand {
            rect: Rect::new(x, y, x + w, y + h),
            score,
            class,
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_shifted() {
        // Overlap 5x10 = 50, union 150
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_degenerate() {
        let a = Rect::new(5.0, 5.0, 5.0, 5.0);
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_from_center() {
        let r = Rect::from_center(50.0, 40.0, 20.0, 10.0);
        assert_eq!(r, Rect::new(40.0, 35.0, 60.0, 45.0));
    }

    #[test]
    fn test_clamp_to_image() {
        let r = Rect::new(-5.0, 10.0, 120.0, 90.0).clamp_to(100.0, 80.0);
        assert_eq!(r, Rect::new(0.0, 10.0, 100.0, 80.0));
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let result = non_max_suppression(
            vec![
                cand(5.0, 5.0, 100.0, 100.0, 0.8, 0),
                cand(0.0, 0.0, 100.0, 100.0, 0.9, 0),
                cand(200.0, 200.0, 50.0, 50.0, 0.7, 0),
            ],
            0.4,
        );
        let scores: Vec<f32> = result.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.9, 0.7]);
    }

    #[test]
    fn test_nms_keeps_overlap_across_classes() {
        let result = non_max_suppression(
            vec![
                cand(0.0, 0.0, 100.0, 100.0, 0.9, 0),
                cand(0.0, 0.0, 100.0, 100.0, 0.8, 1),
            ],
            0.4,
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_nms_empty() {
        let result: Vec<Cand> = non_max_suppression(Vec::new(), 0.4);
        assert!(result.is_empty());
    }
}
