//! Python bindings for detdecode.
//!
//! This module exposes the detection pipeline to Python via PyO3. Model
//! outputs are passed as a dict of float32 numpy arrays in engine order.

use numpy::{PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::collections::BTreeMap;

use detdecode::{
    AllowList, BoxCoordinates, ByName, ClampPolicy, DecodeConfig, DetDecodeError,
    Detection as RustDetection, DetectionPipeline, ImageSize, IouThresholds, LabelTable,
    OutputMap, PipelineConfig as RustPipelineConfig, RoleStrategy, TensorView,
};

/// Convert a DetDecodeError to a Python exception.
fn to_py_err(err: DetDecodeError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

/// Labeled box in original-image pixels.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    #[pyo3(get)]
    pub label: String,
    #[pyo3(get)]
    pub confidence: f32,
    #[pyo3(get)]
    pub left: f32,
    #[pyo3(get)]
    pub top: f32,
    #[pyo3(get)]
    pub right: f32,
    #[pyo3(get)]
    pub bottom: f32,
}

impl Detection {
    fn to_rust(&self) -> RustDetection {
        RustDetection::new(
            self.label.clone(),
            self.confidence,
            self.left,
            self.top,
            self.right,
            self.bottom,
        )
    }
}

#[pymethods]
impl Detection {
    /// Box as a `(left, top, right, bottom)` tuple.
    fn rect(&self) -> (f32, f32, f32, f32) {
        (self.left, self.top, self.right, self.bottom)
    }

    /// Intersection over union with another detection.
    fn iou(&self, other: &Detection) -> f32 {
        self.to_rust().iou(&other.to_rust())
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(label='{}', confidence={:.4}, rect=({:.1}, {:.1}, {:.1}, {:.1}))",
            self.label, self.confidence, self.left, self.top, self.right, self.bottom
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            label: d.label,
            confidence: d.confidence,
            left: d.left,
            top: d.top,
            right: d.right,
            bottom: d.bottom,
        }
    }
}

fn parse_coordinates(value: &str) -> PyResult<BoxCoordinates> {
    match value.to_lowercase().as_str() {
        "model_pixels" => Ok(BoxCoordinates::ModelPixels),
        "normalized" => Ok(BoxCoordinates::Normalized),
        _ => Err(PyValueError::new_err(
            "coordinates must be 'model_pixels' or 'normalized'",
        )),
    }
}

fn parse_clamp(value: &str) -> PyResult<ClampPolicy> {
    match value.to_lowercase().as_str() {
        "image_bounds" => Ok(ClampPolicy::ImageBounds),
        "origin_only" => Ok(ClampPolicy::OriginOnly),
        _ => Err(PyValueError::new_err(
            "clamp must be 'image_bounds' or 'origin_only'",
        )),
    }
}

fn parse_roles(
    roles: &str,
    boxes: Option<String>,
    scores: Option<String>,
    classes: Option<String>,
) -> PyResult<RoleStrategy> {
    let names = || -> PyResult<ByName> {
        match (boxes.clone(), scores.clone()) {
            (Some(b), Some(s)) => Ok(ByName::new(b, s, classes.clone())),
            _ => Err(PyValueError::new_err(
                "boxes and scores names are required for name-based roles",
            )),
        }
    };
    match roles.to_lowercase().as_str() {
        "shape" => Ok(RoleStrategy::Shape),
        "position" => Ok(RoleStrategy::Position),
        "name" => Ok(RoleStrategy::Name(names()?)),
        "name_then_shape" => Ok(RoleStrategy::NameThenShape(names()?)),
        _ => Err(PyValueError::new_err(
            "roles must be 'shape', 'position', 'name' or 'name_then_shape'",
        )),
    }
}

/// Configuration for the detection pipeline.
#[pyclass]
#[derive(Clone)]
pub struct PipelineConfig {
    inner: RustPipelineConfig,
}

#[pymethods]
impl PipelineConfig {
    /// Create a new PipelineConfig.
    ///
    /// Args:
    ///     confidence_threshold: Exclusive lower bound on confidence (default: 0.4)
    ///     input_tile_size: Side of the square model input in pixels (default: 640.0)
    ///     coordinates: "model_pixels" or "normalized" (default: "model_pixels")
    ///     clamp: "image_bounds" or "origin_only" (default: "image_bounds")
    ///     allow_list: Labels to keep (default: person, cup, apple, banana)
    ///     allow_any: Keep every label, ignoring allow_list (default: False)
    ///     default_iou: Suppression threshold for labels without override (default: 0.7)
    ///     iou_overrides: Per-label thresholds (default: {"person": 0.65})
    ///     roles: "shape", "position", "name" or "name_then_shape" (default: "shape")
    ///     boxes, scores, classes: Output names for name-based roles
    #[new]
    #[pyo3(signature = (
        confidence_threshold = 0.4,
        input_tile_size = 640.0,
        coordinates = "model_pixels",
        clamp = "image_bounds",
        allow_list = None,
        allow_any = false,
        default_iou = 0.7,
        iou_overrides = None,
        roles = "shape",
        boxes = None,
        scores = None,
        classes = None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        confidence_threshold: f32,
        input_tile_size: f32,
        coordinates: &str,
        clamp: &str,
        allow_list: Option<Vec<String>>,
        allow_any: bool,
        default_iou: f32,
        iou_overrides: Option<BTreeMap<String, f32>>,
        roles: &str,
        boxes: Option<String>,
        scores: Option<String>,
        classes: Option<String>,
    ) -> PyResult<Self> {
        let allow_list = match (allow_any, allow_list) {
            (true, _) => AllowList::Any,
            (false, Some(labels)) => AllowList::only(labels),
            (false, None) => AllowList::default(),
        };
        let nms = match iou_overrides {
            Some(overrides) => IouThresholds {
                default_iou,
                overrides,
            },
            None => IouThresholds {
                default_iou,
                ..IouThresholds::default()
            },
        };
        let inner = RustPipelineConfig {
            decode: DecodeConfig {
                confidence_threshold,
                input_tile_size,
                coordinates: parse_coordinates(coordinates)?,
                clamp: parse_clamp(clamp)?,
            },
            allow_list,
            nms,
            roles: parse_roles(roles, boxes, scores, classes)?,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        let clamp = match self.inner.decode.clamp {
            ClampPolicy::ImageBounds => "image_bounds",
            ClampPolicy::OriginOnly => "origin_only",
        };
        format!(
            "PipelineConfig(confidence_threshold={}, input_tile_size={}, clamp='{}', default_iou={})",
            self.inner.decode.confidence_threshold,
            self.inner.decode.input_tile_size,
            clamp,
            self.inner.nms.default_iou
        )
    }
}

type ArrayList<'py> = Vec<(String, PyReadonlyArrayDyn<'py, f32>)>;

fn collect_arrays<'py>(outputs: &Bound<'py, PyDict>) -> PyResult<ArrayList<'py>> {
    let mut arrays = Vec::with_capacity(outputs.len());
    for (name, value) in outputs.iter() {
        let name: String = name.extract()?;
        let array: PyReadonlyArrayDyn<'py, f32> = value.extract()?;
        arrays.push((name, array));
    }
    Ok(arrays)
}

fn build_map<'a>(arrays: &'a ArrayList<'_>) -> PyResult<OutputMap<'a>> {
    let mut map = OutputMap::new();
    for (name, array) in arrays {
        let view = TensorView::new(array.as_slice()?, array.shape()).map_err(to_py_err)?;
        map.insert(name.clone(), view);
    }
    Ok(map)
}

/// Detection post-processing pipeline.
#[pyclass]
pub struct Pipeline {
    inner: DetectionPipeline,
}

#[pymethods]
impl Pipeline {
    /// Create a pipeline from a list of labels.
    ///
    /// Args:
    ///     labels: Class names; the list index is the class index
    ///     config: PipelineConfig (default: PipelineConfig())
    #[new]
    #[pyo3(signature = (labels, config = None))]
    fn new(labels: Vec<String>, config: Option<PipelineConfig>) -> PyResult<Self> {
        let labels = LabelTable::new(labels).map_err(to_py_err)?;
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = DetectionPipeline::new(labels, cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Create a pipeline from a label file with one class name per line.
    #[staticmethod]
    #[pyo3(signature = (path, config = None))]
    fn from_label_file(path: &str, config: Option<PipelineConfig>) -> PyResult<Self> {
        let labels = LabelTable::load(path).map_err(to_py_err)?;
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = DetectionPipeline::new(labels, cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Decode one frame of model outputs.
    ///
    /// Args:
    ///     outputs: dict of output name to contiguous float32 numpy array
    ///     width: Original image width in pixels
    ///     height: Original image height in pixels
    ///     strict: Raise when output roles cannot be resolved (default: False)
    ///
    /// Returns:
    ///     List of Detection objects, highest confidence first
    #[pyo3(signature = (outputs, width, height, strict = false))]
    fn detect(
        &self,
        outputs: &Bound<'_, PyDict>,
        width: u32,
        height: u32,
        strict: bool,
    ) -> PyResult<Vec<Detection>> {
        let arrays = collect_arrays(outputs)?;
        let map = build_map(&arrays)?;
        let image = ImageSize::new(width, height);
        let detections = if strict {
            self.inner.try_detect(&map, image).map_err(to_py_err)?
        } else {
            self.inner.detect(&map, image)
        };
        Ok(detections.into_iter().map(Detection::from).collect())
    }

    /// Decode several frames in parallel.
    ///
    /// Args:
    ///     frames: list of (outputs, width, height) tuples
    ///
    /// Returns:
    ///     One list of Detection objects per frame, in input order
    fn detect_batch(
        &self,
        frames: Vec<(Bound<'_, PyDict>, u32, u32)>,
    ) -> PyResult<Vec<Vec<Detection>>> {
        let arrays = frames
            .iter()
            .map(|(outputs, _, _)| collect_arrays(outputs))
            .collect::<PyResult<Vec<_>>>()?;
        let inputs = arrays
            .iter()
            .zip(&frames)
            .map(|(a, (_, w, h))| Ok((build_map(a)?, ImageSize::new(*w, *h))))
            .collect::<PyResult<Vec<_>>>()?;
        let results = self.inner.detect_batch_par(&inputs);
        Ok(results
            .into_iter()
            .map(|dets| dets.into_iter().map(Detection::from).collect())
            .collect())
    }

    /// Number of labels in the table.
    #[getter]
    fn num_labels(&self) -> usize {
        self.inner.labels().len()
    }

    fn __repr__(&self) -> String {
        format!("Pipeline(num_labels={})", self.inner.labels().len())
    }
}

/// Intersection over union of two `(left, top, right, bottom)` boxes.
#[pyfunction]
fn iou(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> f32 {
    let a = RustDetection::new("", 0.0, a.0, a.1, a.2, a.3);
    let b = RustDetection::new("", 0.0, b.0, b.1, b.2, b.3);
    a.iou(&b)
}

/// Python module for detdecode.
#[pymodule]
fn _detdecode(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<PipelineConfig>()?;
    m.add_class::<Pipeline>()?;
    m.add_function(wrap_pyfunction!(iou, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
