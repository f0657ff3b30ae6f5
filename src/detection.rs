//! Final detection record.

use crate::util::math::{rect_area, rect_iou};

/// Labeled box in original-image pixel coordinates.
///
/// Emitted detections satisfy `right > left` and `bottom > top`.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Class label copied from the label table.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Left edge in pixels.
    pub left: f32,
    /// Top edge in pixels.
    pub top: f32,
    /// Right edge in pixels.
    pub right: f32,
    /// Bottom edge in pixels.
    pub bottom: f32,
}

impl Detection {
    /// Creates a detection from a label, confidence and `(left, top, right, bottom)`.
    pub fn new(
        label: impl Into<String>,
        confidence: f32,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    ) -> Self {
        Self {
            label: label.into(),
            confidence,
            left,
            top,
            right,
            bottom,
        }
    }

    /// Returns `[left, top, right, bottom]`.
    pub fn rect(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    /// Box width in pixels.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Box height in pixels.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Box area in square pixels.
    pub fn area(&self) -> f32 {
        rect_area(self.rect())
    }

    /// Intersection over union with `other`; 0 when the boxes do not overlap.
    pub fn iou(&self, other: &Detection) -> f32 {
        rect_iou(self.rect(), other.rect())
    }
}
