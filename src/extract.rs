//! Score activation and confidence filtering.
//!
//! Raw logits are clipped, passed through a sigmoid, and compared against the
//! minimum score. Surviving anchors become detections in anchor order.

use crate::anchors::AnchorTable;
use crate::config::{BoxScales, DetectorConfig, NUM_CLASSES, NUM_COORDS};
use crate::decode::decode_row;
use crate::detection::{Detection, Detections};
use crate::tensor::TensorView;
use crate::util::math::{clip, sigmoid};
use crate::util::{BlazePostError, BlazePostResult};

/// Clips a raw logit to `[-clip_thresh, clip_thresh]` and applies a sigmoid.
#[inline]
pub fn activate_score(raw: f32, clip_thresh: f32) -> f32 {
    sigmoid(clip(raw, clip_thresh))
}

/// Activates a `[batch, anchors, 1]` score tensor into `[batch, anchors]`.
pub fn activate_scores(raw_scores: TensorView<'_>, clip_thresh: f32) -> BlazePostResult<Vec<f32>> {
    if raw_scores.width() != NUM_CLASSES {
        return Err(BlazePostError::ShapeMismatch {
            tensor: "raw_scores",
            expected: [raw_scores.batch(), raw_scores.rows(), NUM_CLASSES],
            got: raw_scores.shape(),
        });
    }
    if let Some(index) = raw_scores.first_nan() {
        return Err(BlazePostError::NonFiniteInput {
            tensor: "raw_scores",
            index,
        });
    }
    Ok(raw_scores
        .as_slice()
        .iter()
        .map(|&raw| activate_score(raw, clip_thresh))
        .collect())
}

/// Builds one image's detections from its regression block and raw logits.
///
/// `boxes` holds `anchors * 16` raw regression values and `raw_scores` one
/// logit per anchor. Non-finite regressions and NaN logits are rejected with
/// indices relative to this image. Only anchors whose activated score reaches
/// `min_score` are decoded.
pub fn image_detections(
    boxes: &[f32],
    raw_scores: &[f32],
    anchors: &AnchorTable,
    scales: &BoxScales,
    clip_thresh: f32,
    min_score: f32,
) -> BlazePostResult<Detections> {
    if raw_scores.len() != anchors.len() {
        return Err(BlazePostError::BufferLengthMismatch {
            expected: anchors.len(),
            got: raw_scores.len(),
        });
    }
    if boxes.len() != anchors.len() * NUM_COORDS {
        return Err(BlazePostError::BufferLengthMismatch {
            expected: anchors.len() * NUM_COORDS,
            got: boxes.len(),
        });
    }
    if let Some(index) = boxes.iter().position(|v| !v.is_finite()) {
        return Err(BlazePostError::NonFiniteInput {
            tensor: "raw_boxes",
            index,
        });
    }
    if let Some(index) = raw_scores.iter().position(|v| v.is_nan()) {
        return Err(BlazePostError::NonFiniteInput {
            tensor: "raw_scores",
            index,
        });
    }

    let mut out = Detections::new();
    for (i, (anchor, &raw)) in anchors.iter().zip(raw_scores).enumerate() {
        let score = activate_score(raw, clip_thresh);
        if score >= min_score {
            out.push(Detection::new(decode_row(boxes, i, anchor, scales), score));
        }
    }
    Ok(out)
}

/// Converts batched raw outputs into one detection list per image.
///
/// Shapes are validated before any arithmetic; an image without surviving
/// anchors yields an empty list.
pub fn tensors_to_detections(
    raw_boxes: TensorView<'_>,
    raw_scores: TensorView<'_>,
    anchors: &AnchorTable,
    cfg: &DetectorConfig,
) -> BlazePostResult<Vec<Detections>> {
    validate_raw_outputs(raw_boxes, raw_scores, anchors.len())?;
    (0..raw_boxes.batch())
        .map(|b| image_detections_at(raw_boxes, raw_scores, anchors, cfg, b))
        .collect()
}

pub(crate) fn image_detections_at(
    raw_boxes: TensorView<'_>,
    raw_scores: TensorView<'_>,
    anchors: &AnchorTable,
    cfg: &DetectorConfig,
    index: usize,
) -> BlazePostResult<Detections> {
    let boxes = raw_boxes
        .item(index)
        .ok_or(BlazePostError::InternalInvariant("box batch item out of range"))?;
    let scores = raw_scores
        .item(index)
        .ok_or(BlazePostError::InternalInvariant("score batch item out of range"))?;
    image_detections(
        boxes,
        scores,
        anchors,
        &cfg.scales,
        cfg.score_clipping_thresh,
        cfg.min_score_thresh,
    )
}

/// Checks shapes and values of both network outputs.
pub(crate) fn validate_raw_outputs(
    raw_boxes: TensorView<'_>,
    raw_scores: TensorView<'_>,
    num_anchors: usize,
) -> BlazePostResult<()> {
    raw_boxes.expect_shape("raw_boxes", num_anchors, NUM_COORDS)?;
    raw_scores.expect_shape("raw_scores", num_anchors, NUM_CLASSES)?;
    if raw_boxes.batch() != raw_scores.batch() {
        return Err(BlazePostError::BatchMismatch {
            boxes: raw_boxes.batch(),
            scores: raw_scores.batch(),
        });
    }
    if let Some(index) = raw_boxes.first_non_finite() {
        return Err(BlazePostError::NonFiniteInput {
            tensor: "raw_boxes",
            index,
        });
    }
    if let Some(index) = raw_scores.first_nan() {
        return Err(BlazePostError::NonFiniteInput {
            tensor: "raw_scores",
            index,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{activate_score, activate_scores, image_detections, tensors_to_detections};
    use crate::anchors::AnchorTable;
    use crate::config::{BoxScales, DetectorConfig};
    use crate::tensor::TensorView;
    use crate::util::BlazePostError;

    fn small_table() -> AnchorTable {
        AnchorTable::from_flat(
            &[0.1, 0.1, 1.0, 1.0, 0.2, 0.2, 1.0, 1.0, 0.3, 0.3, 1.0, 1.0],
            3,
        )
        .unwrap()
    }

    #[test]
    fn activation_clips_before_sigmoid() {
        assert_eq!(activate_score(1e9, 100.0), activate_score(100.0, 100.0));
        assert_eq!(
            activate_score(f32::NEG_INFINITY, 100.0),
            activate_score(-100.0, 100.0)
        );
        assert!((activate_score(0.0, 100.0) - 0.5).abs() < 1e-7);
    }

    #[test]
    fn activate_scores_rejects_nan_and_wide_scores() {
        let data = [0.0, f32::NAN];
        let view = TensorView::new(&data, 1, 2, 1).unwrap();
        assert_eq!(
            activate_scores(view, 100.0).unwrap_err(),
            BlazePostError::NonFiniteInput {
                tensor: "raw_scores",
                index: 1
            }
        );
        let view = TensorView::new(&data, 1, 1, 2).unwrap();
        assert!(matches!(
            activate_scores(view, 100.0),
            Err(BlazePostError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn kept_anchors_stay_in_anchor_order() {
        let anchors = small_table();
        let boxes = vec![0.0f32; 3 * 16];
        let scores = [5.0, -5.0, 3.0];
        let scales = BoxScales::uniform(128.0);
        let dets = image_detections(&boxes, &scores, &anchors, &scales, 100.0, 0.75).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets.get(0).unwrap().xmin(), 0.1);
        assert_eq!(dets.get(1).unwrap().xmin(), 0.3);
        assert!(dets.get(0).unwrap().score > dets.get(1).unwrap().score);
    }

    #[test]
    fn threshold_is_inclusive() {
        let anchors = small_table();
        let boxes = vec![0.0f32; 3 * 16];
        let scores = [0.0, 0.0, 0.0];
        let scales = BoxScales::uniform(128.0);
        let dets = image_detections(&boxes, &scores, &anchors, &scales, 100.0, 0.5).unwrap();
        assert_eq!(dets.len(), 3);
    }

    #[test]
    fn single_image_rejects_nan_logits_and_regressions() {
        let anchors = small_table();
        let scales = BoxScales::uniform(128.0);
        let mut boxes = vec![0.0f32; 3 * 16];
        let scores = [-5.0, f32::NAN, 5.0];
        assert_eq!(
            image_detections(&boxes, &scores, &anchors, &scales, 100.0, 0.5).unwrap_err(),
            BlazePostError::NonFiniteInput {
                tensor: "raw_scores",
                index: 1
            }
        );

        boxes[20] = f32::NAN;
        let scores = [5.0, 5.0, 5.0];
        assert_eq!(
            image_detections(&boxes, &scores, &anchors, &scales, 100.0, 0.5).unwrap_err(),
            BlazePostError::NonFiniteInput {
                tensor: "raw_boxes",
                index: 20
            }
        );
    }

    #[test]
    fn saturated_logits_pass_or_fail_everything() {
        let mut cfg = DetectorConfig::front();
        cfg.num_anchors = 3;
        let anchors = small_table();
        let boxes = vec![0.0f32; 2 * 3 * 16];
        let scores = [100.0, 100.0, 100.0, -100.0, -100.0, -100.0];
        let dets = tensors_to_detections(
            TensorView::new(&boxes, 2, 3, 16).unwrap(),
            TensorView::new(&scores, 2, 3, 1).unwrap(),
            &anchors,
            &cfg,
        )
        .unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].len(), 3);
        assert!(dets[1].is_empty());
    }

    #[test]
    fn batch_sizes_must_agree() {
        let cfg = DetectorConfig::front();
        let anchors = small_table();
        let boxes = vec![0.0f32; 2 * 3 * 16];
        let scores = [0.0f32; 3];
        assert_eq!(
            tensors_to_detections(
                TensorView::new(&boxes, 2, 3, 16).unwrap(),
                TensorView::new(&scores, 1, 3, 1).unwrap(),
                &anchors,
                &cfg,
            )
            .unwrap_err(),
            BlazePostError::BatchMismatch { boxes: 2, scores: 1 }
        );
    }
}
