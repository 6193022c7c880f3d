//! Detector configuration for the two BlazeFace variants.
//!
//! The configuration is an immutable record chosen at construction time. The
//! front model works on 128x128 inputs, the back model on 256x256; everything
//! else is shared.

use crate::util::{BlazePostError, BlazePostResult};

/// Number of anchors produced by both BlazeFace variants.
pub const NUM_ANCHORS: usize = 896;
/// Values per regression row: 4 box offsets plus 6 keypoints.
pub const NUM_COORDS: usize = 16;
/// Number of keypoints per detection.
pub const NUM_KEYPOINTS: usize = 6;
/// Number of score classes (single-class face detector).
pub const NUM_CLASSES: usize = 1;
/// Values per detection record: 16 coordinates plus the score.
pub const DETECTION_LEN: usize = NUM_COORDS + 1;
/// Values per anchor row: center x, center y, width, height.
pub const ANCHOR_LEN: usize = 4;

/// BlazeFace model variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ModelVariant {
    /// Short-range front-camera model, 128x128 input.
    #[default]
    Front,
    /// Full-range back-camera model, 256x256 input.
    Back,
}

impl ModelVariant {
    /// Square input resolution in pixels.
    pub fn input_size(self) -> usize {
        match self {
            ModelVariant::Front => 128,
            ModelVariant::Back => 256,
        }
    }

    /// Default minimum detection confidence.
    pub fn min_score_thresh(self) -> f32 {
        match self {
            ModelVariant::Front => 0.75,
            ModelVariant::Back => 0.65,
        }
    }

    /// Lowercase name used in configs and bindings.
    pub fn name(self) -> &'static str {
        match self {
            ModelVariant::Front => "front",
            ModelVariant::Back => "back",
        }
    }

    /// Parses a variant name, case-insensitively.
    pub fn from_name(name: &str) -> BlazePostResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "front" => Ok(ModelVariant::Front),
            "back" => Ok(ModelVariant::Back),
            _ => Err(BlazePostError::InvalidInput(
                "variant must be 'front' or 'back'",
            )),
        }
    }
}

/// Divisors applied to raw regression values before anchor scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxScales {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoxScales {
    /// Uses the same divisor for every component.
    pub fn uniform(scale: f32) -> Self {
        Self {
            x: scale,
            y: scale,
            w: scale,
            h: scale,
        }
    }
}

/// Post-processing configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Model variant the constants were taken from.
    pub variant: ModelVariant,
    /// Expected anchor count.
    pub num_anchors: usize,
    /// Expected regression width per anchor.
    pub num_coords: usize,
    /// Expected score classes per anchor.
    pub num_classes: usize,
    /// Regression divisors.
    pub scales: BoxScales,
    /// Raw logits are clamped to `[-score_clipping_thresh, score_clipping_thresh]`.
    pub score_clipping_thresh: f32,
    /// Detections scoring below this are dropped before NMS.
    pub min_score_thresh: f32,
    /// IOU above which two detections are merged.
    pub min_suppression_threshold: f32,
    /// Process batch images in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::front()
    }
}

impl DetectorConfig {
    /// Settings for the front-camera model.
    pub fn front() -> Self {
        Self::for_variant(ModelVariant::Front)
    }

    /// Settings for the back-camera model.
    pub fn back() -> Self {
        Self::for_variant(ModelVariant::Back)
    }

    /// Settings for the given model variant.
    pub fn for_variant(variant: ModelVariant) -> Self {
        Self {
            variant,
            num_anchors: NUM_ANCHORS,
            num_coords: NUM_COORDS,
            num_classes: NUM_CLASSES,
            scales: BoxScales::uniform(variant.input_size() as f32),
            score_clipping_thresh: 100.0,
            min_score_thresh: variant.min_score_thresh(),
            min_suppression_threshold: 0.3,
            parallel: false,
        }
    }

    /// Returns a copy with parallel batch processing toggled.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks every field for values the pipeline cannot honor.
    pub fn validate(&self) -> BlazePostResult<()> {
        if self.num_anchors == 0 {
            return Err(BlazePostError::InvalidConfig {
                field: "num_anchors",
                reason: "must be positive",
            });
        }
        if self.num_coords != NUM_COORDS {
            return Err(BlazePostError::InvalidConfig {
                field: "num_coords",
                reason: "must be 16 (4 box values and 6 keypoints)",
            });
        }
        if self.num_classes != NUM_CLASSES {
            return Err(BlazePostError::InvalidConfig {
                field: "num_classes",
                reason: "only single-class scores are supported",
            });
        }
        let scales = [self.scales.x, self.scales.y, self.scales.w, self.scales.h];
        if scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(BlazePostError::InvalidConfig {
                field: "scales",
                reason: "must be finite and positive",
            });
        }
        if !self.score_clipping_thresh.is_finite() || self.score_clipping_thresh <= 0.0 {
            return Err(BlazePostError::InvalidConfig {
                field: "score_clipping_thresh",
                reason: "must be finite and positive",
            });
        }
        if !(self.min_score_thresh > 0.0 && self.min_score_thresh <= 1.0) {
            return Err(BlazePostError::InvalidConfig {
                field: "min_score_thresh",
                reason: "must be in (0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.min_suppression_threshold) {
            return Err(BlazePostError::InvalidConfig {
                field: "min_suppression_threshold",
                reason: "must be in [0, 1]",
            });
        }
        Ok(())
    }
}
