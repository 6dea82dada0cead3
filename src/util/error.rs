//! Error types for yolopost.

use crate::decode::CoordSpace;
use thiserror::Error;

/// Result alias for yolopost operations.
pub type PostResult<T> = std::result::Result<T, PostError>;

/// Errors that can occur while post-processing detector output.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PostError {
    /// A threshold is not finite or lies outside `[0, 1]`.
    #[error("invalid threshold {name}={value}: expected a value in [0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// A height or width is zero.
    #[error("invalid dimensions {height}x{width}")]
    InvalidDimensions { height: usize, width: usize },
    /// The configured class count is zero.
    #[error("invalid class count {classes}")]
    InvalidClassCount { classes: usize },
    /// The tensor channel count does not match the class count.
    #[error("channel mismatch: expected {expected} channels, got {got}")]
    ChannelMismatch { expected: usize, got: usize },
    /// The tensor buffer length disagrees with its declared shape.
    #[error("buffer length mismatch: shape needs {expected} values, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },
    /// The anchor list does not provide one pair per anchor slot.
    #[error("anchor count mismatch: tensor has {expected} anchors per cell, got {got} pairs")]
    AnchorCountMismatch { expected: usize, got: usize },
    /// Anchor values cannot describe box sizes.
    #[error("invalid anchors: {reason}")]
    InvalidAnchors { reason: &'static str },
    /// A box has non-finite or inverted corners.
    #[error("invalid box: {reason}")]
    InvalidBox { reason: &'static str },
    /// A box carries a class vector of unexpected length.
    #[error("box {index} has {got} class scores, expected {expected}")]
    ClassVectorMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
    /// A box is not in the coordinate space the operation expects.
    #[error("box is in {got:?} coordinates, expected {expected:?}")]
    CoordSpaceMismatch { expected: CoordSpace, got: CoordSpace },
    /// Image decoding or probing failed.
    #[error("image I/O error: {reason}")]
    ImageIo { reason: String },
}
