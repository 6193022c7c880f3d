//! Individual pipeline stages for custom post-processing.
//!
//! Most users only need [`crate::Detector`]. These re-exports let callers run
//! decoding, activation, or overlap computations on their own.

pub use crate::anchors::generate::{AnchorLayer, SsdAnchorLayout};
pub use crate::anchors::io::{
    anchors_from_le_bytes, anchors_to_le_bytes, load_anchors, load_anchors_raw,
};
#[cfg(feature = "npy")]
pub use crate::anchors::io::{anchors_from_npy_bytes, load_anchors_npy};
pub use crate::decode::{decode_box, decode_boxes};
pub use crate::extract::{activate_score, activate_scores, image_detections, tensors_to_detections};
pub use crate::geometry::{box_area, intersect, iou, jaccard, overlap_similarity, BoxCorners};
pub use crate::tensor::f32s_from_le_bytes;
