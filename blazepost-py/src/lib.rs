//! Python bindings for the blazepost post-processing library.
//!
//! Network outputs come in as float32 numpy arrays and detections go back out
//! as `(n, 17)` float32 arrays, one per image.

use numpy::ndarray::Array2;
use numpy::{
    IntoPyArray, PyArray2, PyReadonlyArray2, PyReadonlyArrayDyn, PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use blazepost::lowlevel::load_anchors;
use blazepost::{
    generate_anchors as rust_generate_anchors,
    weighted_non_max_suppression as rust_weighted_nms, BlazePostError, Detections,
    Detector as RustDetector, DetectorConfig, ModelVariant, NmsConfig, TensorView, DETECTION_LEN,
    NUM_ANCHORS,
};

/// Convert a BlazePostError to a Python exception.
fn to_py_err(err: BlazePostError) -> PyErr {
    match err {
        BlazePostError::InternalInvariant(_) => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn parse_variant(variant: &str) -> PyResult<ModelVariant> {
    ModelVariant::from_name(variant).map_err(to_py_err)
}

fn detections_to_array<'py>(
    py: Python<'py>,
    detections: &Detections,
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let array = Array2::from_shape_vec((detections.len(), DETECTION_LEN), detections.to_rows())
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    Ok(array.into_pyarray(py))
}

/// BlazeFace post-processor.
#[pyclass]
pub struct Detector {
    inner: RustDetector,
}

#[pymethods]
impl Detector {
    /// Create a detector.
    ///
    /// Args:
    ///     variant: "front" (128 px) or "back" (256 px) (default: "front")
    ///     anchors: Path to a raw float32 or .npy anchor table; generated if None
    ///     min_score_thresh: Override the variant's score threshold
    ///     min_suppression_threshold: IOU above which detections merge (default: 0.3)
    ///     parallel: Process batch images in parallel (default: False)
    #[new]
    #[pyo3(signature = (
        variant = "front",
        anchors = None,
        min_score_thresh = None,
        min_suppression_threshold = 0.3,
        parallel = false
    ))]
    fn new(
        variant: &str,
        anchors: Option<&str>,
        min_score_thresh: Option<f32>,
        min_suppression_threshold: f32,
        parallel: bool,
    ) -> PyResult<Self> {
        let variant = parse_variant(variant)?;
        let mut cfg = DetectorConfig::for_variant(variant).with_parallel(parallel);
        if let Some(thresh) = min_score_thresh {
            cfg.min_score_thresh = thresh;
        }
        cfg.min_suppression_threshold = min_suppression_threshold;

        let table = match anchors {
            Some(path) => load_anchors(path, NUM_ANCHORS),
            None => rust_generate_anchors(variant),
        }
        .map_err(to_py_err)?;
        let inner = RustDetector::new(cfg, table).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Post-process a batch of raw network outputs.
    ///
    /// Args:
    ///     raw_boxes: float32 array of shape (batch, 896, 16)
    ///     raw_scores: float32 array of shape (batch, 896, 1)
    ///
    /// Returns:
    ///     List of (n, 17) float32 arrays, one per image; n may be 0
    fn postprocess<'py>(
        &self,
        py: Python<'py>,
        raw_boxes: PyReadonlyArrayDyn<'py, f32>,
        raw_scores: PyReadonlyArrayDyn<'py, f32>,
    ) -> PyResult<Vec<Bound<'py, PyArray2<f32>>>> {
        let boxes_shape = raw_boxes.shape().to_vec();
        let scores_shape = raw_scores.shape().to_vec();
        let boxes = TensorView::from_shape("raw_boxes", raw_boxes.as_slice()?, &boxes_shape)
            .map_err(to_py_err)?;
        let scores = TensorView::from_shape("raw_scores", raw_scores.as_slice()?, &scores_shape)
            .map_err(to_py_err)?;

        let results = self.inner.postprocess(boxes, scores).map_err(to_py_err)?;
        results
            .iter()
            .map(|faces| detections_to_array(py, faces))
            .collect()
    }

    /// Variant name ("front" or "back").
    #[getter]
    fn variant(&self) -> &'static str {
        self.inner.config().variant.name()
    }

    /// Minimum score for a detection to survive.
    #[getter]
    fn min_score_thresh(&self) -> f32 {
        self.inner.config().min_score_thresh
    }

    /// Anchor table as a (896, 4) float32 array.
    fn anchors<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f32>>> {
        let table = self.inner.anchors();
        let array = Array2::from_shape_vec((table.len(), 4), table.to_flat())
            .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
        Ok(array.into_pyarray(py))
    }

    fn __repr__(&self) -> String {
        let cfg = self.inner.config();
        format!(
            "Detector(variant='{}', min_score_thresh={}, min_suppression_threshold={}, parallel={})",
            cfg.variant.name(),
            cfg.min_score_thresh,
            cfg.min_suppression_threshold,
            cfg.parallel
        )
    }
}

/// Blend overlapping detections of one image.
///
/// Args:
///     detections: float32 array of shape (n, 17)
///     min_suppression_threshold: IOU above which detections merge (default: 0.3)
///
/// Returns:
///     (m, 17) float32 array ordered by descending cluster seed score
#[pyfunction]
#[pyo3(signature = (detections, min_suppression_threshold = 0.3))]
fn weighted_nms<'py>(
    py: Python<'py>,
    detections: PyReadonlyArray2<'py, f32>,
    min_suppression_threshold: f32,
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    if detections.shape()[1] != DETECTION_LEN {
        return Err(PyValueError::new_err("detections must have 17 columns"));
    }
    let input = Detections::from_rows(detections.as_slice()?).map_err(to_py_err)?;
    let cfg = NmsConfig {
        min_suppression_threshold,
    };
    let merged = rust_weighted_nms(&input, cfg).map_err(to_py_err)?;
    detections_to_array(py, &merged)
}

/// Generate the BlazeFace anchor table.
///
/// Args:
///     variant: "front" or "back" (default: "front")
///
/// Returns:
///     (896, 4) float32 array of [center_x, center_y, width, height]
#[pyfunction]
#[pyo3(signature = (variant = "front"))]
fn generate_anchors<'py>(py: Python<'py>, variant: &str) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let table = rust_generate_anchors(parse_variant(variant)?).map_err(to_py_err)?;
    let array = Array2::from_shape_vec((table.len(), 4), table.to_flat())
        .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
    Ok(array.into_pyarray(py))
}

/// Python module for BlazeFace post-processing.
#[pymodule]
fn _blazepost(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detector>()?;
    m.add_function(wrap_pyfunction!(weighted_nms, m)?)?;
    m.add_function(wrap_pyfunction!(generate_anchors, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
