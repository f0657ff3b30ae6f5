//! Candidate decoding.
//!
//! Walks every candidate slot of the resolved outputs, applies the confidence
//! threshold and maps boxes from model-input space to original-image pixels.
//! Decoding is a pure function of read-only inputs.

use crate::observe::Rejection;
use crate::roles::ResolvedRoles;
use crate::util::math::in_unit_interval;
use crate::util::{DetDecodeError, DetDecodeResult};

/// Coordinate convention of the boxes output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoxCoordinates {
    /// Pixels of the square model input; divided by the tile size.
    #[default]
    ModelPixels,
    /// Already normalized to `[0, 1]`.
    Normalized,
}

/// Upper clamp applied to decoded boxes.
///
/// Left and top are always clamped to 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClampPolicy {
    /// Cap right at the image width and bottom at the image height.
    #[default]
    ImageBounds,
    /// Leave right and bottom as scaled.
    OriginOnly,
}

/// Decoding parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeConfig {
    /// Candidates with confidence at or below this value are skipped.
    pub confidence_threshold: f32,
    /// Side length of the square model input, in pixels.
    pub input_tile_size: f32,
    /// Coordinate convention of the boxes output.
    pub coordinates: BoxCoordinates,
    /// Upper clamp policy.
    pub clamp: ClampPolicy,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            input_tile_size: 640.0,
            coordinates: BoxCoordinates::ModelPixels,
            clamp: ClampPolicy::ImageBounds,
        }
    }
}

impl DecodeConfig {
    /// Checks threshold and tile size ranges.
    pub fn validate(&self) -> DetDecodeResult<()> {
        if !in_unit_interval(self.confidence_threshold) {
            return Err(DetDecodeError::InvalidConfig {
                reason: "confidence_threshold must be in [0, 1]",
            });
        }
        if !self.input_tile_size.is_finite() || self.input_tile_size <= 0.0 {
            return Err(DetDecodeError::InvalidConfig {
                reason: "input_tile_size must be > 0",
            });
        }
        Ok(())
    }
}

/// Size of the original image the model input was produced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// Creates an image size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Decoded candidate in original-image pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Slot index in the model output.
    pub index: usize,
    /// Rounded class index; `0` for single-class models.
    pub class_index: i64,
    /// Confidence after the upper clamp to 1.0.
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

/// Number of candidate slots that can be read safely.
///
/// Starts from the scores' candidate count and is capped by the number of
/// complete boxes and, when present, the classes element count.
pub fn candidate_count(roles: &ResolvedRoles<'_>) -> usize {
    let scores = roles.scores.1.candidate_count().min(roles.scores.1.len());
    let boxes = roles.boxes.1.len() / 4;
    let mut n = scores.min(boxes);
    if let Some((_, classes)) = roles.classes {
        n = n.min(classes.len());
    }
    n
}

/// Decodes all candidates, discarding rejection reasons.
pub fn decode_candidates(
    roles: &ResolvedRoles<'_>,
    cfg: &DecodeConfig,
    image: ImageSize,
) -> Vec<Candidate> {
    decode_candidates_with(roles, cfg, image, |_, _| {})
}

/// Decodes all candidates, reporting every skipped slot to `on_reject`.
pub fn decode_candidates_with<F>(
    roles: &ResolvedRoles<'_>,
    cfg: &DecodeConfig,
    image: ImageSize,
    mut on_reject: F,
) -> Vec<Candidate>
where
    F: FnMut(usize, Rejection),
{
    let n = candidate_count(roles);
    let scores = roles.scores.1.data();
    let boxes = roles.boxes.1.data();
    let classes = roles.classes.map(|(_, view)| view.data());

    let (img_w, img_h) = (image.width as f32, image.height as f32);
    let norm = match cfg.coordinates {
        BoxCoordinates::ModelPixels => cfg.input_tile_size,
        BoxCoordinates::Normalized => 1.0,
    };

    let mut out = Vec::new();
    for i in 0..n {
        let raw = scores[i];
        // f32::min would turn NaN into 1.0.
        let confidence = if raw > 1.0 { 1.0 } else { raw };
        if confidence.is_nan() || confidence <= cfg.confidence_threshold {
            on_reject(i, Rejection::BelowThreshold { confidence });
            continue;
        }

        let class_index = match classes {
            Some(values) => class_index_from(values[i]),
            None => 0,
        };

        let b = &boxes[i * 4..i * 4 + 4];
        if b.iter().any(|v| !v.is_finite()) {
            on_reject(i, Rejection::DegenerateGeometry);
            continue;
        }

        let left = (b[0] / norm * img_w).max(0.0);
        let top = (b[1] / norm * img_h).max(0.0);
        let mut right = b[2] / norm * img_w;
        let mut bottom = b[3] / norm * img_h;
        if cfg.clamp == ClampPolicy::ImageBounds {
            right = right.min(img_w);
            bottom = bottom.min(img_h);
        }

        if right <= left || bottom <= top {
            on_reject(i, Rejection::DegenerateGeometry);
            continue;
        }

        out.push(Candidate {
            index: i,
            class_index,
            confidence,
            left,
            top,
            right,
            bottom,
        });
    }
    out
}

/// Rounds a raw class value; non-finite values map to -1, which no label
/// table resolves.
fn class_index_from(raw: f32) -> i64 {
    if raw.is_finite() {
        raw.round() as i64
    } else {
        -1
    }
}
