//! Weighted non-maximum suppression.
//!
//! Instead of discarding lower-scoring duplicates, every cluster of overlapping
//! detections is blended into one: coordinates are averaged with the scores as
//! weights and the cluster score is the plain mean of its members.
//!
//! Detections are visited in descending score order. Equal scores keep their
//! input order (the sort is stable), so results are deterministic for a given
//! input.

use crate::config::NUM_COORDS;
use crate::detection::{Detection, Detections};
use crate::geometry::{overlap_similarity, BoxCorners};
use crate::trace::{trace_event, trace_span};
use crate::util::{BlazePostError, BlazePostResult};

/// Suppression settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Detections whose IOU with the seed exceeds this are merged into it.
    pub min_suppression_threshold: f32,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            min_suppression_threshold: 0.3,
        }
    }
}

impl NmsConfig {
    pub fn validate(&self) -> BlazePostResult<()> {
        if !(0.0..=1.0).contains(&self.min_suppression_threshold) {
            return Err(BlazePostError::InvalidConfig {
                field: "min_suppression_threshold",
                reason: "must be in [0, 1]",
            });
        }
        Ok(())
    }
}

/// Returns indices of `detections` sorted by descending score, stable on ties.
pub(crate) fn score_order_desc(detections: &[Detection]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| detections[b].score.total_cmp(&detections[a].score));
    order
}

/// Blends overlapping detections of one image.
///
/// The output is ordered by the score of each cluster's seed, highest first.
pub fn weighted_non_max_suppression(
    detections: &Detections,
    cfg: NmsConfig,
) -> BlazePostResult<Detections> {
    cfg.validate()?;
    let items = detections.as_slice();
    if items.is_empty() {
        return Ok(Detections::new());
    }

    let _span = trace_span!("weighted_nms", input = items.len()).entered();

    let order = score_order_desc(items);
    let boxes: Vec<BoxCorners> = order.iter().map(|&i| items[i].bbox()).collect();
    let mut consumed = vec![false; order.len()];
    let mut out = Detections::new();
    let mut merged_clusters = 0usize;

    let mut candidates: Vec<usize> = Vec::with_capacity(order.len());
    let mut candidate_boxes: Vec<BoxCorners> = Vec::with_capacity(order.len());
    let mut members: Vec<usize> = Vec::with_capacity(order.len());

    for seed_pos in 0..order.len() {
        if consumed[seed_pos] {
            continue;
        }

        candidates.clear();
        candidate_boxes.clear();
        for pos in seed_pos..order.len() {
            if !consumed[pos] {
                candidates.push(pos);
                candidate_boxes.push(boxes[pos]);
            }
        }
        let ious = overlap_similarity(&boxes[seed_pos], &candidate_boxes);

        // The seed always belongs to its own cluster, even if its box is degenerate.
        members.clear();
        for (&pos, &iou) in candidates.iter().zip(ious.iter()) {
            if pos == seed_pos || iou > cfg.min_suppression_threshold {
                consumed[pos] = true;
                members.push(order[pos]);
            }
        }

        let seed = items[order[seed_pos]];
        if members.len() == 1 {
            out.push(seed);
            continue;
        }

        out.push(blend(items, &members)?);
        merged_clusters += 1;
        trace_event!(debug, "cluster_merged", members = members.len());
    }

    trace_event!(
        info,
        "weighted_nms_done",
        input = items.len(),
        output = out.len(),
        merged = merged_clusters
    );
    Ok(out)
}

/// Score-weighted average of a cluster; the score is the members' mean.
fn blend(items: &[Detection], members: &[usize]) -> BlazePostResult<Detection> {
    let total: f32 = members.iter().map(|&i| items[i].score).sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(BlazePostError::InternalInvariant(
            "cluster score sum must be positive and finite",
        ));
    }

    let mut coords = [0.0f32; NUM_COORDS];
    for &i in members {
        let det = &items[i];
        for (acc, &c) in coords.iter_mut().zip(det.coords.iter()) {
            *acc += c * det.score;
        }
    }
    for c in coords.iter_mut() {
        *c /= total;
    }

    Ok(Detection::new(coords, total / members.len() as f32))
}
