//! Python bindings for the yolopost post-processing library.
//!
//! Detector outputs are passed as `float32` numpy arrays shaped either
//! `(grid_h, grid_w, anchors, 5 + classes)` or with the last two axes fused,
//! `(grid_h, grid_w, anchors * (5 + classes))`.

use numpy::{PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use yolopost::{
    Anchors, Detection as RustDetection, NetOutputView, PostError,
    PostprocessConfig as RustPostprocessConfig, Postprocessor as RustPostprocessor,
    RawBox as RustRawBox, ScaleOutput,
};

/// Convert a PostError to a Python exception.
fn to_py_err(err: PostError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Builds a shape-checked view over a numpy array.
fn view_of<'a>(
    array: &'a PyReadonlyArrayDyn<'_, f32>,
    num_anchors: usize,
    num_classes: usize,
) -> PyResult<NetOutputView<'a>> {
    let shape = array.shape().to_vec();
    let data = array.as_slice()?;
    let view = match shape.as_slice() {
        &[grid_h, grid_w, anchors, channels] => {
            NetOutputView::new(data, grid_h, grid_w, anchors, channels, num_classes)
        }
        &[grid_h, grid_w, fused] => {
            NetOutputView::from_fused(data, grid_h, grid_w, fused, num_anchors, num_classes)
        }
        _ => {
            return Err(PyValueError::new_err(format!(
                "expected a 3-D or 4-D array, got shape {shape:?}"
            )))
        }
    };
    view.map_err(to_py_err)
}

/// A surviving detection in original image pixels.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    #[pyo3(get)]
    pub class_id: usize,
    #[pyo3(get)]
    pub score: f32,
    #[pyo3(get)]
    pub xmin: i32,
    #[pyo3(get)]
    pub ymin: i32,
    #[pyo3(get)]
    pub xmax: i32,
    #[pyo3(get)]
    pub ymax: i32,
    /// Index of the source box in the decoded batch.
    #[pyo3(get)]
    pub box_index: usize,
}

#[pymethods]
impl Detection {
    fn __repr__(&self) -> String {
        format!(
            "Detection(class_id={}, score={:.4}, box=({}, {}, {}, {}))",
            self.class_id, self.score, self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

impl From<&RustDetection> for Detection {
    fn from(d: &RustDetection) -> Self {
        Self {
            class_id: d.class_id,
            score: d.score,
            xmin: d.rect.xmin,
            ymin: d.rect.ymin,
            xmax: d.rect.xmax,
            ymax: d.rect.ymax,
            box_index: d.box_index,
        }
    }
}

/// A decoded candidate box in normalized network coordinates.
#[pyclass]
#[derive(Clone)]
pub struct RawBox {
    #[pyo3(get)]
    pub xmin: f32,
    #[pyo3(get)]
    pub ymin: f32,
    #[pyo3(get)]
    pub xmax: f32,
    #[pyo3(get)]
    pub ymax: f32,
    #[pyo3(get)]
    pub objectness: f32,
    /// Objectness-weighted class confidences; zero below the threshold.
    #[pyo3(get)]
    pub classes: Vec<f32>,
    #[pyo3(get)]
    pub label: usize,
    #[pyo3(get)]
    pub score: f32,
}

#[pymethods]
impl RawBox {
    fn __repr__(&self) -> String {
        format!(
            "RawBox(box=({:.3}, {:.3}, {:.3}, {:.3}), objectness={:.4}, label={}, score={:.4})",
            self.xmin, self.ymin, self.xmax, self.ymax, self.objectness, self.label, self.score
        )
    }
}

impl From<&RustRawBox> for RawBox {
    fn from(b: &RustRawBox) -> Self {
        let r = b.rect();
        Self {
            xmin: r.xmin,
            ymin: r.ymin,
            xmax: r.xmax,
            ymax: r.ymax,
            objectness: b.objectness(),
            classes: b.classes().to_vec(),
            label: b.label(),
            score: b.score(),
        }
    }
}

/// Thresholds and network geometry for post-processing.
#[pyclass]
#[derive(Clone)]
pub struct PostprocessConfig {
    inner: RustPostprocessConfig,
}

#[pymethods]
impl PostprocessConfig {
    /// Create a new PostprocessConfig.
    ///
    /// Args:
    ///     obj_thresh: Objectness and class confidence floor (default: 0.5)
    ///     nms_thresh: IoU at which same-class boxes are duplicates (default: 0.45)
    ///     net_h: Network input height (default: 416)
    ///     net_w: Network input width (default: 416)
    ///     num_classes: Number of detector classes (default: 80)
    ///     parallel: Decode and suppress in parallel (default: False)
    #[new]
    #[pyo3(signature = (obj_thresh=0.5, nms_thresh=0.45, net_h=416, net_w=416, num_classes=80, parallel=false))]
    fn new(
        obj_thresh: f32,
        nms_thresh: f32,
        net_h: usize,
        net_w: usize,
        num_classes: usize,
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustPostprocessConfig {
            obj_thresh,
            nms_thresh,
            net_h,
            net_w,
            num_classes,
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[getter]
    fn obj_thresh(&self) -> f32 {
        self.inner.obj_thresh
    }

    #[getter]
    fn nms_thresh(&self) -> f32 {
        self.inner.nms_thresh
    }

    #[getter]
    fn num_classes(&self) -> usize {
        self.inner.num_classes
    }

    fn __repr__(&self) -> String {
        format!(
            "PostprocessConfig(obj_thresh={}, nms_thresh={}, net_h={}, net_w={}, num_classes={}, parallel={})",
            self.inner.obj_thresh,
            self.inner.nms_thresh,
            self.inner.net_h,
            self.inner.net_w,
            self.inner.num_classes,
            if self.inner.parallel { "True" } else { "False" }
        )
    }
}

/// Decode -> remap -> suppress pipeline.
#[pyclass]
pub struct Postprocessor {
    inner: RustPostprocessor,
}

#[pymethods]
impl Postprocessor {
    /// Args:
    ///     config: PostprocessConfig (default: PostprocessConfig())
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<PostprocessConfig>) -> Self {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        Self {
            inner: RustPostprocessor::new().with_config(cfg),
        }
    }

    /// Run the full pipeline.
    ///
    /// Args:
    ///     scales: List of (array, anchors) pairs, coarsest scale first.
    ///         `anchors` is a flat [w0, h0, w1, h1, ...] list in network pixels.
    ///     image_h: Original image height
    ///     image_w: Original image width
    ///
    /// Returns:
    ///     List of Detection objects, best first
    fn process(
        &self,
        scales: Vec<(PyReadonlyArrayDyn<'_, f32>, Vec<f32>)>,
        image_h: usize,
        image_w: usize,
    ) -> PyResult<Vec<Detection>> {
        let anchor_sets = scales
            .iter()
            .map(|(_, flat)| Anchors::from_flat(flat))
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_py_err)?;

        let num_classes = self.inner.config().num_classes;
        let mut outputs = Vec::with_capacity(scales.len());
        for ((array, _), anchors) in scales.iter().zip(&anchor_sets) {
            let view = view_of(array, anchors.len(), num_classes)?;
            outputs.push(ScaleOutput::new(view, anchors));
        }

        let set = self
            .inner
            .process(&outputs, image_h, image_w)
            .map_err(to_py_err)?;
        Ok(set.to_vec().iter().map(Detection::from).collect())
    }

    fn __repr__(&self) -> String {
        "Postprocessor()".to_string()
    }
}

/// Decode a single detection scale into normalized candidate boxes.
///
/// Args:
///     netout: float32 array, 3-D fused or 4-D
///     anchors: Flat [w0, h0, w1, h1, ...] anchor list in network pixels
///     obj_thresh: Objectness floor (default: 0.5)
///     net_h: Network input height (default: 416)
///     net_w: Network input width (default: 416)
///     num_classes: Number of classes (default: 80)
///
/// Returns:
///     List of RawBox objects in decode order
#[pyfunction]
#[pyo3(signature = (netout, anchors, obj_thresh = 0.5, net_h = 416, net_w = 416, num_classes = 80))]
fn decode(
    netout: PyReadonlyArrayDyn<'_, f32>,
    anchors: Vec<f32>,
    obj_thresh: f32,
    net_h: usize,
    net_w: usize,
    num_classes: usize,
) -> PyResult<Vec<RawBox>> {
    let anchors = Anchors::from_flat(&anchors).map_err(to_py_err)?;
    let view = view_of(&netout, anchors.len(), num_classes)?;
    let boxes =
        yolopost::decode(view, &anchors, obj_thresh, net_h, net_w).map_err(to_py_err)?;
    Ok(boxes.iter().map(RawBox::from).collect())
}

/// Python module for YOLO detection post-processing.
#[pymodule]
fn _yolopost(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<RawBox>()?;
    m.add_class::<PostprocessConfig>()?;
    m.add_class::<Postprocessor>()?;
    m.add_function(wrap_pyfunction!(decode, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
