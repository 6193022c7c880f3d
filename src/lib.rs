//! blazepost turns raw BlazeFace network outputs into face detections.
//!
//! The crate covers the numeric tail of the detector: anchor-relative box
//! decoding, sigmoid score activation with clipping, confidence filtering, and
//! weighted non-maximum suppression that blends overlapping detections. Model
//! execution stays outside; callers pass the two output tensors as flat `f32`
//! buffers. Optional features add rayon batch parallelism (`rayon`), SIMD IOU
//! (`simd`), `.npy` anchor loading (`npy`), and spans/events (`tracing`).

pub mod anchors;
pub mod config;
pub mod decode;
pub mod detection;
pub mod detector;
pub mod extract;
pub mod geometry;
pub mod lowlevel;
pub mod nms;
pub mod tensor;
mod trace;
pub mod util;

pub use anchors::{generate_anchors, Anchor, AnchorTable};
pub use config::{BoxScales, DetectorConfig, ModelVariant, DETECTION_LEN, NUM_ANCHORS};
pub use detection::{Detection, Detections};
pub use detector::Detector;
pub use nms::{weighted_non_max_suppression, NmsConfig};
pub use tensor::TensorView;
pub use util::{BlazePostError, BlazePostResult};
