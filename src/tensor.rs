//! Borrowed views over rank-3 network outputs.
//!
//! `TensorView` wraps a flat `f32` buffer laid out as `[batch, rows, width]` in
//! row-major order, the layout inference engines hand back for BlazeFace's
//! regression and classification heads. The buffer length must match the
//! shape exactly; nothing is padded or truncated.

use crate::util::{BlazePostError, BlazePostResult};

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Decodes a headerless little-endian `float32` buffer.
pub fn f32s_from_le_bytes(bytes: &[u8]) -> BlazePostResult<Vec<f32>> {
    if bytes.len() % F32_BYTES != 0 {
        return Err(BlazePostError::InvalidInput("byte length is not a multiple of 4"));
    }
    Ok(bytes
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Borrowed `[batch, rows, width]` tensor.
#[derive(Copy, Clone, Debug)]
pub struct TensorView<'a> {
    data: &'a [f32],
    batch: usize,
    rows: usize,
    width: usize,
}

impl<'a> TensorView<'a> {
    /// Creates a view with an explicit shape.
    pub fn new(data: &'a [f32], batch: usize, rows: usize, width: usize) -> BlazePostResult<Self> {
        let expected = batch
            .checked_mul(rows)
            .and_then(|v| v.checked_mul(width))
            .ok_or(BlazePostError::InvalidInput("tensor shape overflows usize"))?;
        if data.len() != expected {
            return Err(BlazePostError::BufferLengthMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            batch,
            rows,
            width,
        })
    }

    /// Creates a view whose batch size is `data.len() / (rows * width)`.
    pub fn with_inferred_batch(
        data: &'a [f32],
        rows: usize,
        width: usize,
    ) -> BlazePostResult<Self> {
        let item = rows
            .checked_mul(width)
            .filter(|&item| item > 0)
            .ok_or(BlazePostError::InvalidInput("rows and width must be positive"))?;
        if data.len() % item != 0 {
            return Err(BlazePostError::InvalidInput(
                "buffer length is not a whole number of batch items",
            ));
        }
        Self::new(data, data.len() / item, rows, width)
    }

    /// Creates a view from a dynamic shape, rejecting anything but rank 3.
    pub fn from_shape(
        tensor: &'static str,
        data: &'a [f32],
        shape: &[usize],
    ) -> BlazePostResult<Self> {
        match *shape {
            [batch, rows, width] => Self::new(data, batch, rows, width),
            _ => Err(BlazePostError::RankMismatch {
                tensor,
                expected: 3,
                got: shape.len(),
            }),
        }
    }

    /// Returns the batch size.
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Returns the number of rows (anchors) per batch item.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of values per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the shape as `[batch, rows, width]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.batch, self.rows, self.width]
    }

    /// Returns the backing slice.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the contiguous `rows * width` block for batch item `index`.
    pub fn item(&self, index: usize) -> Option<&'a [f32]> {
        if index >= self.batch {
            return None;
        }
        let len = self.rows * self.width;
        let start = index * len;
        self.data.get(start..start + len)
    }

    /// Returns row `row` of batch item `index`.
    pub fn row(&self, index: usize, row: usize) -> Option<&'a [f32]> {
        if row >= self.rows {
            return None;
        }
        let item = self.item(index)?;
        let start = row * self.width;
        item.get(start..start + self.width)
    }

    /// Fails with `ShapeMismatch` unless rows and width match the expectation.
    pub fn expect_shape(
        &self,
        tensor: &'static str,
        rows: usize,
        width: usize,
    ) -> BlazePostResult<()> {
        if self.rows != rows || self.width != width {
            return Err(BlazePostError::ShapeMismatch {
                tensor,
                expected: [self.batch, rows, width],
                got: self.shape(),
            });
        }
        Ok(())
    }

    /// Returns the flat index of the first NaN value, if any.
    pub(crate) fn first_nan(&self) -> Option<usize> {
        self.data.iter().position(|v| v.is_nan())
    }

    /// Returns the flat index of the first NaN or infinite value, if any.
    pub(crate) fn first_non_finite(&self) -> Option<usize> {
        self.data.iter().position(|v| !v.is_finite())
    }
}
