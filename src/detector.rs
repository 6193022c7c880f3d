//! Batch post-processing for BlazeFace outputs.
//!
//! A `Detector` owns an immutable configuration and anchor table. Each call
//! validates both network outputs up front, then runs decoding, confidence
//! filtering, and weighted NMS per image. With the `rayon` feature and
//! `DetectorConfig::parallel` set, images are processed on the rayon pool; the
//! per-image results are identical to the sequential path.

use crate::anchors::{generate_anchors, AnchorTable};
use crate::config::{DetectorConfig, NUM_CLASSES, NUM_COORDS};
use crate::detection::Detections;
use crate::extract::{image_detections_at, validate_raw_outputs};
use crate::nms::{weighted_non_max_suppression, NmsConfig};
use crate::tensor::TensorView;
use crate::trace::{trace_event, trace_span};
use crate::util::{BlazePostError, BlazePostResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Face detection post-processor.
#[derive(Clone, Debug)]
pub struct Detector {
    cfg: DetectorConfig,
    anchors: AnchorTable,
}

impl Detector {
    /// Creates a detector after validating the config against the anchors.
    pub fn new(cfg: DetectorConfig, anchors: AnchorTable) -> BlazePostResult<Self> {
        cfg.validate()?;
        if anchors.len() != cfg.num_anchors {
            return Err(BlazePostError::AnchorTable {
                reason: format!(
                    "config expects {} anchors, table has {}",
                    cfg.num_anchors,
                    anchors.len()
                ),
            });
        }
        Ok(Self { cfg, anchors })
    }

    /// Creates a detector with the generated anchor layout of the config's variant.
    pub fn with_generated_anchors(cfg: DetectorConfig) -> BlazePostResult<Self> {
        let anchors = generate_anchors(cfg.variant)?;
        Self::new(cfg, anchors)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    /// Returns the anchor table.
    pub fn anchors(&self) -> &AnchorTable {
        &self.anchors
    }

    fn nms_config(&self) -> NmsConfig {
        NmsConfig {
            min_suppression_threshold: self.cfg.min_suppression_threshold,
        }
    }

    /// Post-processes a batch of `[batch, anchors, 16]` boxes and
    /// `[batch, anchors, 1]` scores into one detection list per image.
    pub fn postprocess(
        &self,
        raw_boxes: TensorView<'_>,
        raw_scores: TensorView<'_>,
    ) -> BlazePostResult<Vec<Detections>> {
        validate_raw_outputs(raw_boxes, raw_scores, self.anchors.len())?;

        let batch = raw_boxes.batch();
        let _span =
            trace_span!("postprocess", batch = batch, parallel = self.cfg.parallel).entered();

        let out = if self.cfg.parallel {
            self.run_parallel(raw_boxes, raw_scores)?
        } else {
            (0..batch)
                .map(|b| self.process_image(raw_boxes, raw_scores, b))
                .collect::<BlazePostResult<Vec<_>>>()?
        };

        trace_event!(
            info,
            "postprocess_done",
            batch = batch,
            faces = out.iter().map(Detections::len).sum::<usize>()
        );
        Ok(out)
    }

    /// Post-processes a single image given its flat `[anchors * 16]` boxes and
    /// `[anchors]` scores.
    pub fn postprocess_image(
        &self,
        raw_boxes: &[f32],
        raw_scores: &[f32],
    ) -> BlazePostResult<Detections> {
        let boxes = TensorView::new(raw_boxes, 1, self.anchors.len(), NUM_COORDS)?;
        let scores = TensorView::new(raw_scores, 1, self.anchors.len(), NUM_CLASSES)?;
        let mut out = self.postprocess(boxes, scores)?;
        out.pop()
            .ok_or(BlazePostError::InternalInvariant("single-image batch produced no output"))
    }

    fn process_image(
        &self,
        raw_boxes: TensorView<'_>,
        raw_scores: TensorView<'_>,
        index: usize,
    ) -> BlazePostResult<Detections> {
        let candidates =
            image_detections_at(raw_boxes, raw_scores, &self.anchors, &self.cfg, index)?;
        let faces = weighted_non_max_suppression(&candidates, self.nms_config())?;
        trace_event!(
            debug,
            "image_done",
            image = index,
            candidates = candidates.len(),
            faces = faces.len()
        );
        Ok(faces)
    }

    #[cfg(feature = "rayon")]
    fn run_parallel(
        &self,
        raw_boxes: TensorView<'_>,
        raw_scores: TensorView<'_>,
    ) -> BlazePostResult<Vec<Detections>> {
        (0..raw_boxes.batch())
            .into_par_iter()
            .map(|b| self.process_image(raw_boxes, raw_scores, b))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn run_parallel(
        &self,
        raw_boxes: TensorView<'_>,
        raw_scores: TensorView<'_>,
    ) -> BlazePostResult<Vec<Detections>> {
        (0..raw_boxes.batch())
            .map(|b| self.process_image(raw_boxes, raw_scores, b))
            .collect()
    }
}
