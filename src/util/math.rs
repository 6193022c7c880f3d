//! Scalar helpers for score activation.

/// Clamps a raw logit to `[-thresh, thresh]`.
#[inline]
pub(crate) fn clip(value: f32, thresh: f32) -> f32 {
    value.clamp(-thresh, thresh)
}

/// Logistic sigmoid.
#[inline]
pub(crate) fn sigmoid(value: f32) -> f32 {
    1.0 / (1.0 + (-value).exp())
}
