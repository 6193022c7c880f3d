//! Anchor priors used to decode regression output.
//!
//! An `AnchorTable` is validated once on construction and never mutated, so a
//! detector can share it freely across threads. Tables can be built from flat
//! float data, read from disk (see [`io`]), or generated from the BlazeFace
//! SSD layout (see [`generate`]).

pub mod generate;
pub mod io;

use crate::config::ANCHOR_LEN;
use crate::util::{BlazePostError, BlazePostResult};

pub use generate::{generate_anchors, AnchorLayer, SsdAnchorLayout};

/// A single anchor prior in normalized image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Anchor {
    pub fn new(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Builds an anchor from a `[center_x, center_y, width, height]` row.
    pub fn from_row(row: [f32; ANCHOR_LEN]) -> Self {
        Self::new(row[0], row[1], row[2], row[3])
    }

    /// Returns the anchor as a `[center_x, center_y, width, height]` row.
    pub fn to_row(&self) -> [f32; ANCHOR_LEN] {
        [self.center_x, self.center_y, self.width, self.height]
    }
}

/// Immutable, shape-checked anchor table.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorTable {
    anchors: Vec<Anchor>,
}

impl AnchorTable {
    /// Wraps anchors after checking the count and that every value is finite.
    pub fn new(anchors: Vec<Anchor>, expected_len: usize) -> BlazePostResult<Self> {
        if anchors.len() != expected_len {
            return Err(BlazePostError::AnchorTable {
                reason: format!("expected {expected_len} anchors, got {}", anchors.len()),
            });
        }
        if let Some(idx) = anchors
            .iter()
            .position(|a| a.to_row().iter().any(|v| !v.is_finite()))
        {
            return Err(BlazePostError::AnchorTable {
                reason: format!("anchor {idx} has a non-finite value"),
            });
        }
        Ok(Self { anchors })
    }

    /// Reshapes flat `[n * 4]` data into `n` anchors.
    pub fn from_flat(data: &[f32], expected_len: usize) -> BlazePostResult<Self> {
        if data.len() % ANCHOR_LEN != 0 {
            return Err(BlazePostError::AnchorTable {
                reason: format!(
                    "{} values cannot be reshaped to [n, {ANCHOR_LEN}]",
                    data.len()
                ),
            });
        }
        let anchors = data
            .chunks_exact(ANCHOR_LEN)
            .map(|row| Anchor::new(row[0], row[1], row[2], row[3]))
            .collect();
        Self::new(anchors, expected_len)
    }

    /// Builds a table from a 2D shape, as reported by array loaders.
    pub fn from_shape(data: &[f32], shape: &[usize], expected_len: usize) -> BlazePostResult<Self> {
        match *shape {
            [rows, ANCHOR_LEN] if rows == expected_len => Self::from_flat(data, expected_len),
            [rows, cols] => Err(BlazePostError::AnchorTable {
                reason: format!(
                    "expected shape [{expected_len}, {ANCHOR_LEN}], got [{rows}, {cols}]"
                ),
            }),
            _ => Err(BlazePostError::AnchorTable {
                reason: format!("expected 2 dimensions, got {}", shape.len()),
            }),
        }
    }

    /// Returns the number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Returns true if the table has no anchors.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Returns the anchor at `index`.
    pub fn get(&self, index: usize) -> Option<&Anchor> {
        self.anchors.get(index)
    }

    /// Returns all anchors in order.
    pub fn as_slice(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Iterates over anchors in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.anchors.iter()
    }

    /// Flattens the table back into `[n * 4]` values.
    pub fn to_flat(&self) -> Vec<f32> {
        self.anchors.iter().flat_map(|a| a.to_row()).collect()
    }
}
