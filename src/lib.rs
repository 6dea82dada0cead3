//! yolopost turns multi-scale YOLO detector output into labeled pixel boxes.
//!
//! The crate decodes raw per-cell, per-anchor activations, maps the resulting
//! boxes from the letterboxed network input back to original image pixels,
//! and removes duplicates with class-wise non-maximum suppression. It never
//! builds or runs a network and performs no I/O unless the `image-io` feature
//! is enabled. Optional parallelism is available via the `rayon` feature.

pub mod classes;
pub mod decode;
pub mod detections;
pub mod geometry;
#[cfg(feature = "image-io")]
pub mod io;
pub mod lowlevel;
mod pipeline;
pub mod remap;
pub mod suppress;
pub mod tensor;
mod trace;
pub mod util;

pub use classes::{ClassTable, COCO_CLASSES};
pub use decode::{Anchors, CoordSpace, RawBox, YOLOV3_ANCHORS};
pub use detections::{Detection, DetectionSet};
pub use geometry::{bbox_iou, interval_overlap, Letterbox, PixelRect, Rect};
pub use pipeline::{PostprocessConfig, Postprocessor, ScaleOutput};
pub use tensor::NetOutputView;
pub use util::{PostError, PostResult};

pub use decode::decode_netout as decode;
pub use remap::correct_boxes as remap;
pub use suppress::suppress;
