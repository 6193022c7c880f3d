use blazepost::{
    generate_anchors, AnchorTable, BlazePostError, Detector, DetectorConfig, ModelVariant,
    TensorView,
};

#[test]
fn tensor_view_rejects_mismatched_lengths() {
    let data = vec![0.0f32; 896 * 16 - 1];
    let err = TensorView::new(&data, 1, 896, 16).unwrap_err();
    assert_eq!(
        err,
        BlazePostError::BufferLengthMismatch {
            expected: 896 * 16,
            got: 896 * 16 - 1,
        }
    );
}

#[test]
fn tensor_view_from_shape_requires_rank_three() {
    let data = vec![0.0f32; 896 * 16];
    let err = TensorView::from_shape("raw_boxes", &data, &[896, 16]).unwrap_err();
    assert_eq!(
        err,
        BlazePostError::RankMismatch {
            tensor: "raw_boxes",
            expected: 3,
            got: 2,
        }
    );
    let view = TensorView::from_shape("raw_boxes", &data, &[1, 896, 16]).unwrap();
    assert_eq!(view.shape(), [1, 896, 16]);
}

#[test]
fn anchor_table_rejects_wrong_row_count() {
    let data = vec![0.5f32; 895 * 4];
    let err = AnchorTable::from_flat(&data, 896).unwrap_err();
    assert!(matches!(err, BlazePostError::AnchorTable { .. }));
    assert!(err.to_string().contains("896"));
}

#[test]
fn anchor_table_rejects_wrong_column_count() {
    let data = vec![0.5f32; 896 * 3];
    assert!(AnchorTable::from_shape(&data, &[896, 3], 896).is_err());
}

#[test]
fn detector_rejects_wrong_box_width() {
    let detector = Detector::with_generated_anchors(DetectorConfig::front()).unwrap();
    let boxes = vec![0.0f32; 896 * 12];
    let scores = vec![0.0f32; 896];
    let err = detector
        .postprocess(
            TensorView::new(&boxes, 1, 896, 12).unwrap(),
            TensorView::new(&scores, 1, 896, 1).unwrap(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        BlazePostError::ShapeMismatch {
            tensor: "raw_boxes",
            expected: [1, 896, 16],
            got: [1, 896, 12],
        }
    );
}

#[test]
fn detector_rejects_multi_class_scores() {
    let detector = Detector::with_generated_anchors(DetectorConfig::back()).unwrap();
    let boxes = vec![0.0f32; 896 * 16];
    let scores = vec![0.0f32; 896 * 2];
    let err = detector
        .postprocess(
            TensorView::new(&boxes, 1, 896, 16).unwrap(),
            TensorView::new(&scores, 1, 896, 2).unwrap(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        BlazePostError::ShapeMismatch {
            tensor: "raw_scores",
            ..
        }
    ));
}

#[test]
fn detector_rejects_batch_mismatch_before_any_work() {
    let detector = Detector::with_generated_anchors(DetectorConfig::front()).unwrap();
    let boxes = vec![0.0f32; 2 * 896 * 16];
    let scores = vec![100.0f32; 896];
    let err = detector
        .postprocess(
            TensorView::new(&boxes, 2, 896, 16).unwrap(),
            TensorView::new(&scores, 1, 896, 1).unwrap(),
        )
        .unwrap_err();
    assert_eq!(err, BlazePostError::BatchMismatch { boxes: 2, scores: 1 });
}

#[test]
fn detector_rejects_non_finite_inputs() {
    let detector = Detector::with_generated_anchors(DetectorConfig::front()).unwrap();
    let mut boxes = vec![0.0f32; 896 * 16];
    let scores = vec![0.0f32; 896];
    boxes[37] = f32::INFINITY;
    let err = detector
        .postprocess(
            TensorView::new(&boxes, 1, 896, 16).unwrap(),
            TensorView::new(&scores, 1, 896, 1).unwrap(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        BlazePostError::NonFiniteInput {
            tensor: "raw_boxes",
            index: 37,
        }
    );

    let boxes = vec![0.0f32; 896 * 16];
    let mut scores = vec![0.0f32; 896];
    scores[5] = f32::NAN;
    let err = detector
        .postprocess(
            TensorView::new(&boxes, 1, 896, 16).unwrap(),
            TensorView::new(&scores, 1, 896, 1).unwrap(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        BlazePostError::NonFiniteInput {
            tensor: "raw_scores",
            index: 5,
        }
    );
}

#[test]
fn infinite_logits_are_clipped_not_rejected() {
    let detector = Detector::with_generated_anchors(DetectorConfig::front()).unwrap();
    let boxes = vec![0.0f32; 896 * 16];
    let scores = vec![f32::NEG_INFINITY; 896];
    let faces = detector.postprocess_image(&boxes, &scores).unwrap();
    assert!(faces.is_empty());
}

#[test]
fn positive_infinite_logits_keep_every_anchor() {
    let detector = Detector::with_generated_anchors(DetectorConfig::front()).unwrap();
    // Zero regressions give zero-area boxes, so no two candidates merge.
    let boxes = vec![0.0f32; 896 * 16];
    let scores = vec![f32::INFINITY; 896];
    let faces = detector.postprocess_image(&boxes, &scores).unwrap();
    assert_eq!(faces.len(), 896);
    assert!(faces.iter().all(|face| face.score > 0.999 && face.score <= 1.0));
}

#[test]
fn generated_anchors_match_between_variants() {
    let front = generate_anchors(ModelVariant::Front).unwrap();
    let back = generate_anchors(ModelVariant::Back).unwrap();
    assert_eq!(front.len(), 896);
    assert_eq!(front, back);
}

#[test]
fn empty_batch_produces_empty_output() {
    let detector = Detector::with_generated_anchors(DetectorConfig::front()).unwrap();
    let out = detector
        .postprocess(
            TensorView::new(&[], 0, 896, 16).unwrap(),
            TensorView::new(&[], 0, 896, 1).unwrap(),
        )
        .unwrap();
    assert!(out.is_empty());
}
