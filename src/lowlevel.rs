//! Building blocks for custom post-processing pipelines.
//!
//! Most users should prefer [`crate::Postprocessor`]; these re-exports expose
//! the individual stages for callers that drive them separately.

pub use crate::decode::{decode_netout, RawBox};
pub use crate::geometry::{bbox_iou, interval_overlap, Letterbox};
pub use crate::remap::{correct_boxes, correct_boxes_with};
pub use crate::suppress::suppress;
#[cfg(feature = "rayon")]
pub use crate::suppress::suppress_par;
pub use crate::tensor::{NetOutputView, BOX_CHANNELS};
