//! Per-label non-maximum suppression.
//!
//! Detections are visited in descending confidence; each one that survives
//! suppresses every later detection of the same label whose IoU with it
//! exceeds that label's threshold. Labels never suppress each other.

use crate::util::math::in_unit_interval;
use crate::util::{DetDecodeError, DetDecodeResult};
use crate::Detection;
use std::collections::BTreeMap;

/// IoU thresholds with per-label overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct IouThresholds {
    /// Threshold for labels without an override.
    pub default_iou: f32,
    /// Label-specific thresholds.
    pub overrides: BTreeMap<String, f32>,
}

impl Default for IouThresholds {
    fn default() -> Self {
        Self {
            default_iou: 0.70,
            overrides: BTreeMap::from([("person".to_owned(), 0.65)]),
        }
    }
}

impl IouThresholds {
    /// Uniform threshold with no overrides.
    pub fn uniform(iou: f32) -> Self {
        Self {
            default_iou: iou,
            overrides: BTreeMap::new(),
        }
    }

    /// Adds or replaces an override.
    pub fn with_override(mut self, label: impl Into<String>, iou: f32) -> Self {
        self.overrides.insert(label.into(), iou);
        self
    }

    /// Threshold applicable to `label`.
    pub fn for_label(&self, label: &str) -> f32 {
        self.overrides
            .get(label)
            .copied()
            .unwrap_or(self.default_iou)
    }

    /// Checks that every threshold lies in `[0, 1]`.
    pub fn validate(&self) -> DetDecodeResult<()> {
        if !in_unit_interval(self.default_iou) {
            return Err(DetDecodeError::InvalidConfig {
                reason: "default_iou must be in [0, 1]",
            });
        }
        if self.overrides.values().any(|&iou| !in_unit_interval(iou)) {
            return Err(DetDecodeError::InvalidConfig {
                reason: "iou overrides must be in [0, 1]",
            });
        }
        Ok(())
    }
}

/// Indices of `detections` in descending confidence; ties keep input order.
fn order_desc(detections: &[Detection]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    // sort_by is stable, so equal confidences stay in input order.
    order.sort_by(|&a, &b| {
        detections[b]
            .confidence
            .total_cmp(&detections[a].confidence)
    });
    order
}

/// Greedy per-label suppression.
///
/// Returns survivors in selection order (descending confidence).
pub fn suppress(detections: Vec<Detection>, thresholds: &IouThresholds) -> Vec<Detection> {
    if detections.is_empty() {
        return Vec::new();
    }

    let order = order_desc(&detections);
    let mut suppressed = vec![false; detections.len()];
    let mut kept = Vec::new();

    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        kept.push(i);

        let current = &detections[i];
        let threshold = thresholds.for_label(&current.label);
        for &j in &order[pos + 1..] {
            if suppressed[j] || detections[j].label != current.label {
                continue;
            }
            if current.iou(&detections[j]) > threshold {
                suppressed[j] = true;
            }
        }
    }

    let mut slots: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
    kept.into_iter().filter_map(|i| slots[i].take()).collect()
}
