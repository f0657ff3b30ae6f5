//! Rectangle helpers shared by decoding and suppression.

/// Area of a `[left, top, right, bottom]` rectangle.
///
/// Inverted rectangles yield a negative or zero area; callers only pass boxes
/// that already passed the geometry check.
pub(crate) fn rect_area(r: [f32; 4]) -> f32 {
    (r[2] - r[0]) * (r[3] - r[1])
}

/// Intersection over union of two `[left, top, right, bottom]` rectangles.
///
/// Returns 0 when the intersection is degenerate (`right < left` or
/// `bottom < top`) or when the union is not positive.
pub(crate) fn rect_iou(a: [f32; 4], b: [f32; 4]) -> f32 {
    let left = a[0].max(b[0]);
    let top = a[1].max(b[1]);
    let right = a[2].min(b[2]);
    let bottom = a[3].min(b[3]);
    if right < left || bottom < top {
        return 0.0;
    }

    let inter = (right - left) * (bottom - top);
    let union = rect_area(a) + rect_area(b) - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Returns true when `value` is finite and inside `[0, 1]`.
pub(crate) fn in_unit_interval(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::{in_unit_interval, rect_area, rect_iou};

    #[test]
    fn iou_of_identical_rects_is_one() {
        let r = [1.0, 2.0, 11.0, 7.0];
        assert!((rect_iou(r, r) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_rects_is_zero() {
        assert_eq!(rect_iou([0.0, 0.0, 5.0, 5.0], [6.0, 6.0, 9.0, 9.0]), 0.0);
    }

    #[test]
    fn touching_rects_have_zero_overlap() {
        assert_eq!(rect_iou([0.0, 0.0, 5.0, 5.0], [5.0, 0.0, 9.0, 5.0]), 0.0);
    }

    #[test]
    fn iou_matches_nested_boxes() {
        let outer = [10.0, 10.0, 50.0, 50.0];
        let inner = [12.0, 12.0, 48.0, 48.0];
        assert_eq!(rect_area(outer), 1600.0);
        assert!((rect_iou(outer, inner) - 1296.0 / 1600.0).abs() < 1e-6);
    }

    #[test]
    fn unit_interval_rejects_nan() {
        assert!(in_unit_interval(0.0));
        assert!(in_unit_interval(1.0));
        assert!(!in_unit_interval(f32::NAN));
        assert!(!in_unit_interval(1.01));
    }
}
