//! Anchor box priors for one detection scale.

use crate::util::{PostError, PostResult};

/// YOLOv3 COCO anchors as flat `(w, h)` pairs in network pixels, coarsest
/// scale (13x13 grid at 416 input) first.
pub const YOLOV3_ANCHORS: [[f32; 6]; 3] = [
    [116.0, 90.0, 156.0, 198.0, 373.0, 326.0],
    [30.0, 61.0, 62.0, 45.0, 59.0, 119.0],
    [10.0, 13.0, 16.0, 30.0, 33.0, 23.0],
];

/// Anchor `(width, height)` pairs, one per anchor slot of a grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchors {
    pairs: Vec<(f32, f32)>,
}

impl Anchors {
    /// Creates an anchor set from `(width, height)` pairs.
    pub fn new(pairs: Vec<(f32, f32)>) -> PostResult<Self> {
        if pairs.is_empty() {
            return Err(PostError::InvalidAnchors {
                reason: "anchor list is empty",
            });
        }
        if pairs
            .iter()
            .any(|&(w, h)| !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0))
        {
            return Err(PostError::InvalidAnchors {
                reason: "anchor sizes must be finite and positive",
            });
        }
        Ok(Self { pairs })
    }

    /// Creates an anchor set from a flat `[w0, h0, w1, h1, ...]` list.
    pub fn from_flat(values: &[f32]) -> PostResult<Self> {
        if values.len() % 2 != 0 {
            return Err(PostError::InvalidAnchors {
                reason: "flat anchor list must have an even length",
            });
        }
        Self::new(values.chunks_exact(2).map(|p| (p[0], p[1])).collect())
    }

    /// The three YOLOv3 COCO anchor sets, coarsest scale first.
    pub fn yolov3() -> PostResult<Vec<Anchors>> {
        YOLOV3_ANCHORS.iter().map(|s| Self::from_flat(s)).collect()
    }

    /// Number of anchor pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false; empty sets are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the pair for anchor slot `idx`.
    pub fn get(&self, idx: usize) -> Option<(f32, f32)> {
        self.pairs.get(idx).copied()
    }

    /// Iterates over the `(width, height)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.pairs.iter().copied()
    }
}
