//! Box overlap geometry.
//!
//! Boxes are axis-aligned and stored as `[ymin, xmin, ymax, xmax]`, the same
//! order the decoder emits. Extents are clamped at zero, so inverted boxes have
//! zero area. Whenever the union is not strictly positive the IOU is defined as
//! `0.0`; no NaN or infinity ever leaves this module.

#[cfg(feature = "simd")]
mod simd;

/// Axis-aligned box as `[ymin, xmin, ymax, xmax]`.
pub type BoxCorners = [f32; 4];

/// Area of a box, treating negative extents as empty.
#[inline]
pub fn box_area(b: &BoxCorners) -> f32 {
    let h = (b[2] - b[0]).max(0.0);
    let w = (b[3] - b[1]).max(0.0);
    h * w
}

/// Intersection area of two boxes.
#[inline]
pub fn intersect(a: &BoxCorners, b: &BoxCorners) -> f32 {
    let h = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let w = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    h * w
}

#[inline]
pub(crate) fn ratio_or_zero(inter: f32, union: f32) -> f32 {
    if union > 0.0 {
        let iou = inter / union;
        if iou.is_finite() {
            return iou.clamp(0.0, 1.0);
        }
    }
    0.0
}

/// Intersection over union of two boxes.
#[inline]
pub fn iou(a: &BoxCorners, b: &BoxCorners) -> f32 {
    let inter = intersect(a, b);
    let union = box_area(a) + box_area(b) - inter;
    ratio_or_zero(inter, union)
}

/// Computes the IOU between `reference` and each box in `others`.
pub fn overlap_similarity(reference: &BoxCorners, others: &[BoxCorners]) -> Vec<f32> {
    let mut out = Vec::with_capacity(others.len());
    #[cfg(feature = "simd")]
    simd::overlap_similarity_into(reference, others, &mut out);
    #[cfg(not(feature = "simd"))]
    out.extend(others.iter().map(|other| iou(reference, other)));
    out
}

/// Computes the full `boxes_a.len() x boxes_b.len()` IOU matrix in row-major order.
pub fn jaccard(boxes_a: &[BoxCorners], boxes_b: &[BoxCorners]) -> Vec<f32> {
    let mut out = Vec::with_capacity(boxes_a.len() * boxes_b.len());
    for a in boxes_a {
        out.extend(overlap_similarity(a, boxes_b));
    }
    out
}
