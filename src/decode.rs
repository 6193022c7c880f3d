//! Anchor-relative box decoding.
//!
//! Regression rows hold offsets relative to an anchor, expressed in input
//! pixels. Dividing by the input resolution and scaling by the anchor size
//! yields normalized coordinates. The output row order is
//! `[ymin, xmin, ymax, xmax, kp1_x, kp1_y, ..., kp6_x, kp6_y]`.

use crate::anchors::{Anchor, AnchorTable};
use crate::config::{BoxScales, NUM_COORDS, NUM_KEYPOINTS};
use crate::tensor::TensorView;
use crate::util::{BlazePostError, BlazePostResult};

/// Decodes one regression row against its anchor.
#[inline]
pub fn decode_box(
    raw: &[f32; NUM_COORDS],
    anchor: &Anchor,
    scales: &BoxScales,
) -> [f32; NUM_COORDS] {
    let x_center = raw[0] / scales.x * anchor.width + anchor.center_x;
    let y_center = raw[1] / scales.y * anchor.height + anchor.center_y;
    let w = raw[2] / scales.w * anchor.width;
    let h = raw[3] / scales.h * anchor.height;

    let mut out = [0.0; NUM_COORDS];
    out[0] = y_center - h / 2.0;
    out[1] = x_center - w / 2.0;
    out[2] = y_center + h / 2.0;
    out[3] = x_center + w / 2.0;

    for k in 0..NUM_KEYPOINTS {
        let offset = 4 + k * 2;
        out[offset] = raw[offset] / scales.x * anchor.width + anchor.center_x;
        out[offset + 1] = raw[offset + 1] / scales.y * anchor.height + anchor.center_y;
    }
    out
}

/// Decodes row `index` of a single image's `[anchors * 16]` regression block.
#[inline]
pub(crate) fn decode_row(
    item: &[f32],
    index: usize,
    anchor: &Anchor,
    scales: &BoxScales,
) -> [f32; NUM_COORDS] {
    let start = index * NUM_COORDS;
    let mut raw = [0.0; NUM_COORDS];
    raw.copy_from_slice(&item[start..start + NUM_COORDS]);
    decode_box(&raw, anchor, scales)
}

/// Decodes a whole `[batch, anchors, 16]` regression tensor.
///
/// Returns a flat buffer with the same shape as the input.
pub fn decode_boxes(
    raw_boxes: TensorView<'_>,
    anchors: &AnchorTable,
    scales: &BoxScales,
) -> BlazePostResult<Vec<f32>> {
    raw_boxes.expect_shape("raw_boxes", anchors.len(), NUM_COORDS)?;

    let mut out = Vec::with_capacity(raw_boxes.as_slice().len());
    for b in 0..raw_boxes.batch() {
        let item = raw_boxes
            .item(b)
            .ok_or(BlazePostError::InternalInvariant("batch item out of range"))?;
        for (i, anchor) in anchors.iter().enumerate() {
            out.extend_from_slice(&decode_row(item, i, anchor, scales));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{decode_box, decode_boxes};
    use crate::anchors::{Anchor, AnchorTable};
    use crate::config::BoxScales;
    use crate::tensor::TensorView;
    use crate::util::BlazePostError;

    #[test]
    fn zero_regression_collapses_onto_anchor_center() {
        let anchor = Anchor::new(0.25, 0.75, 1.0, 1.0);
        let out = decode_box(&[0.0; 16], &anchor, &BoxScales::uniform(128.0));
        assert_eq!(&out[..4], &[0.75, 0.25, 0.75, 0.25]);
        for k in 0..6 {
            assert_eq!(out[4 + 2 * k], 0.25);
            assert_eq!(out[5 + 2 * k], 0.75);
        }
    }

    #[test]
    fn offsets_scale_by_resolution_and_anchor_size() {
        let anchor = Anchor::new(0.5, 0.5, 0.5, 0.25);
        let mut raw = [0.0f32; 16];
        raw[0] = 64.0; // x shift: 64 / 128 * 0.5 = 0.25
        raw[1] = 128.0; // y shift: 128 / 128 * 0.25 = 0.25
        raw[2] = 128.0; // w: 128 / 128 * 0.5 = 0.5
        raw[3] = 64.0; // h: 64 / 128 * 0.25 = 0.125
        raw[4] = -128.0;
        raw[15] = 256.0;
        let out = decode_box(&raw, &anchor, &BoxScales::uniform(128.0));
        assert!((out[0] - 0.6875).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.8125).abs() < 1e-6);
        assert!((out[3] - 1.0).abs() < 1e-6);
        assert!((out[4] - 0.0).abs() < 1e-6);
        assert!((out[15] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn batch_items_decode_independently() {
        let anchors = AnchorTable::from_flat(&[0.1, 0.2, 1.0, 1.0, 0.6, 0.7, 1.0, 1.0], 2).unwrap();
        let mut raw = vec![0.0f32; 2 * 2 * 16];
        raw[32] = 12.8; // second image, first anchor, x offset
        let view = TensorView::new(&raw, 2, 2, 16).unwrap();
        let out = decode_boxes(view, &anchors, &BoxScales::uniform(128.0)).unwrap();
        assert_eq!(out.len(), raw.len());
        assert_eq!(out[1], 0.1);
        assert!((out[33] - 0.2).abs() < 1e-6);
        assert_eq!(out[16..20], [0.7, 0.6, 0.7, 0.6]);
        assert_eq!(out[48..52], [0.7, 0.6, 0.7, 0.6]);
    }

    #[test]
    fn anchor_count_must_match() {
        let anchors = AnchorTable::from_flat(&[0.5, 0.5, 1.0, 1.0], 1).unwrap();
        let raw = vec![0.0f32; 2 * 16];
        let view = TensorView::new(&raw, 1, 2, 16).unwrap();
        assert_eq!(
            decode_boxes(view, &anchors, &BoxScales::uniform(128.0)).unwrap_err(),
            BlazePostError::ShapeMismatch {
                tensor: "raw_boxes",
                expected: [1, 1, 16],
                got: [1, 2, 16],
            }
        );
    }
}
