//! SIMD one-vs-many IOU using the `wide` crate.
//!
//! Eight candidate boxes are processed per iteration; the final ratio and its
//! zero fallback run per lane through the scalar path so results agree with
//! the scalar kernel.

use super::{iou, ratio_or_zero, BoxCorners};
use wide::f32x8;

const LANES: usize = 8;

/// Gathers one coordinate of eight boxes into a vector.
#[inline]
fn gather(chunk: &[BoxCorners], coord: usize) -> f32x8 {
    f32x8::from([
        chunk[0][coord],
        chunk[1][coord],
        chunk[2][coord],
        chunk[3][coord],
        chunk[4][coord],
        chunk[5][coord],
        chunk[6][coord],
        chunk[7][coord],
    ])
}

pub(super) fn overlap_similarity_into(
    reference: &BoxCorners,
    others: &[BoxCorners],
    out: &mut Vec<f32>,
) {
    let ry0 = f32x8::splat(reference[0]);
    let rx0 = f32x8::splat(reference[1]);
    let ry1 = f32x8::splat(reference[2]);
    let rx1 = f32x8::splat(reference[3]);
    let ref_area = f32x8::splat(super::box_area(reference));

    let mut chunks = others.chunks_exact(LANES);
    for chunk in &mut chunks {
        let y0 = gather(chunk, 0);
        let x0 = gather(chunk, 1);
        let y1 = gather(chunk, 2);
        let x1 = gather(chunk, 3);

        let inter_h = (ry1.min(y1) - ry0.max(y0)).max(f32x8::ZERO);
        let inter_w = (rx1.min(x1) - rx0.max(x0)).max(f32x8::ZERO);
        let inter = inter_h * inter_w;

        let area = (y1 - y0).max(f32x8::ZERO) * (x1 - x0).max(f32x8::ZERO);
        let union = ref_area + area - inter;

        let inter = inter.to_array();
        let union = union.to_array();
        for lane in 0..LANES {
            out.push(ratio_or_zero(inter[lane], union[lane]));
        }
    }

    for other in chunks.remainder() {
        out.push(iou(reference, other));
    }
}
