//! Class vocabulary and display colours for rendering collaborators.
//!
//! The post-processing core only needs the class count; names and colours are
//! kept here so that a renderer receives them explicitly instead of reading
//! shared state.

use crate::util::{PostError, PostResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed for the default colour table.
pub const DEFAULT_COLOR_SEED: u64 = 2018;

/// The 80-class COCO vocabulary in detector output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorbike", "aeroplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "sofa",
    "pottedplant", "bed", "diningtable", "toilet", "tvmonitor", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Class names with one RGB colour per class.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassTable {
    names: Vec<String>,
    colors: Vec<[u8; 3]>,
}

impl ClassTable {
    /// Builds a table with colours drawn from a generator seeded with `seed`.
    pub fn new(names: Vec<String>, seed: u64) -> PostResult<Self> {
        if names.is_empty() {
            return Err(PostError::InvalidClassCount { classes: 0 });
        }
        let colors = seeded_colors(names.len(), seed);
        Ok(Self { names, colors })
    }

    /// Parses one class name per line, skipping blank lines.
    pub fn from_lines(text: &str, seed: u64) -> PostResult<Self> {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        Self::new(names, seed)
    }

    /// COCO vocabulary with the default colour seed.
    pub fn coco() -> Self {
        Self {
            names: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
            colors: seeded_colors(COCO_CLASSES.len(), DEFAULT_COLOR_SEED),
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false; empty tables are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of `class_id`, if known.
    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Colour of `class_id`, if known.
    pub fn color(&self, class_id: usize) -> Option<[u8; 3]> {
        self.colors.get(class_id).copied()
    }

    /// All class names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

fn seeded_colors(count: usize, seed: u64) -> Vec<[u8; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| [rng.random(), rng.random(), rng.random()])
        .collect()
}
