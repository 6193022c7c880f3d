//! Loading anchor tables from disk.
//!
//! The native format is a headerless little-endian `float32` array that
//! reshapes to `[n, 4]`. With the `npy` feature, NumPy `.npy` files holding a
//! 2D `float32` or `float64` array are accepted as well.

use crate::anchors::AnchorTable;
use crate::config::ANCHOR_LEN;
use crate::tensor::f32s_from_le_bytes;
use crate::util::{BlazePostError, BlazePostResult};
use std::path::Path;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Parses a headerless little-endian `float32` buffer.
pub fn anchors_from_le_bytes(bytes: &[u8], expected_len: usize) -> BlazePostResult<AnchorTable> {
    let row_bytes = F32_BYTES * ANCHOR_LEN;
    if bytes.len() % row_bytes != 0 {
        return Err(BlazePostError::AnchorTable {
            reason: format!(
                "{} bytes is not a whole number of {row_bytes}-byte anchor rows",
                bytes.len()
            ),
        });
    }
    let values = f32s_from_le_bytes(bytes)?;
    AnchorTable::from_flat(&values, expected_len)
}

/// Serializes a table to the headerless little-endian `float32` format.
pub fn anchors_to_le_bytes(table: &AnchorTable) -> Vec<u8> {
    table
        .to_flat()
        .into_iter()
        .flat_map(f32::to_le_bytes)
        .collect()
}

/// Reads a headerless `float32` anchor file.
pub fn load_anchors_raw<P: AsRef<Path>>(
    path: P,
    expected_len: usize,
) -> BlazePostResult<AnchorTable> {
    let bytes = read_file(path.as_ref())?;
    anchors_from_le_bytes(&bytes, expected_len)
}

/// Reads an anchor file, choosing the format from the extension.
///
/// `.npy` files need the `npy` feature; any other extension is read as raw
/// `float32`.
pub fn load_anchors<P: AsRef<Path>>(path: P, expected_len: usize) -> BlazePostResult<AnchorTable> {
    let path = path.as_ref();
    let is_npy = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("npy"));
    if is_npy {
        return load_npy_if_enabled(path, expected_len);
    }
    load_anchors_raw(path, expected_len)
}

#[cfg(feature = "npy")]
fn load_npy_if_enabled(path: &Path, expected_len: usize) -> BlazePostResult<AnchorTable> {
    load_anchors_npy(path, expected_len)
}

#[cfg(not(feature = "npy"))]
fn load_npy_if_enabled(_path: &Path, _expected_len: usize) -> BlazePostResult<AnchorTable> {
    Err(BlazePostError::InvalidInput(
        ".npy anchor files require the `npy` feature",
    ))
}

/// Parses an in-memory `.npy` anchor array.
#[cfg(feature = "npy")]
pub fn anchors_from_npy_bytes(bytes: &[u8], expected_len: usize) -> BlazePostResult<AnchorTable> {
    use ndarray::ArrayD;
    use ndarray_npy::ReadNpyExt;
    use std::io::Cursor;

    let array: ArrayD<f32> = match ArrayD::<f32>::read_npy(Cursor::new(bytes)) {
        Ok(array) => array,
        Err(f32_err) => ArrayD::<f64>::read_npy(Cursor::new(bytes))
            .map(|array| array.mapv(|v| v as f32))
            .map_err(|_| BlazePostError::AnchorTable {
                reason: format!("unreadable npy data: {f32_err}"),
            })?,
    };
    let shape = array.shape().to_vec();
    let values: Vec<f32> = array.iter().copied().collect();
    AnchorTable::from_shape(&values, &shape, expected_len)
}

/// Reads a NumPy `.npy` anchor file.
#[cfg(feature = "npy")]
pub fn load_anchors_npy<P: AsRef<Path>>(
    path: P,
    expected_len: usize,
) -> BlazePostResult<AnchorTable> {
    let bytes = read_file(path.as_ref())?;
    anchors_from_npy_bytes(&bytes, expected_len)
}

fn read_file(path: &Path) -> BlazePostResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| BlazePostError::Io {
        reason: format!("{}: {err}", path.display()),
    })
}
