//! Decoding raw detector activations into candidate boxes.
//!
//! For each grid cell `(row, col)` and anchor slot `b` of a scale, the decoder
//! applies the logistic function to the x/y offsets, the objectness and the
//! class logits, weights the class scores by objectness, and keeps the slot
//! only when its objectness exceeds the threshold. Box centres are expressed
//! relative to the grid, box sizes relative to the network input through the
//! anchor priors, so every emitted box is in normalized `[0, 1]` network
//! coordinates.

mod anchors;

pub use anchors::{Anchors, YOLOV3_ANCHORS};

use crate::geometry::{PixelRect, Rect};
use crate::tensor::NetOutputView;
use crate::trace::{trace_event, trace_skip, trace_span};
use crate::util::math::{argmax, is_unit_interval, sigmoid};
use crate::util::{PostError, PostResult};

/// Coordinate space a box is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordSpace {
    /// Fractions of the network input, as produced by the decoder.
    Normalized,
    /// Whole pixels of the original image, as produced by the remapper.
    Pixel,
}

/// A decoded candidate box with its per-class confidences.
///
/// Class confidences are already weighted by objectness. Suppression zeroes
/// entries in place; a zero entry means the box is not a candidate for that
/// class. The vector length is fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct RawBox {
    rect: Rect,
    objectness: f32,
    classes: Box<[f32]>,
    space: CoordSpace,
}

impl RawBox {
    /// Creates a box in normalized network coordinates.
    pub fn new(rect: Rect, objectness: f32, classes: Vec<f32>) -> PostResult<Self> {
        Self::new_in(CoordSpace::Normalized, rect, objectness, classes)
    }

    /// Creates a box in the given coordinate space.
    pub fn new_in(
        space: CoordSpace,
        rect: Rect,
        objectness: f32,
        classes: Vec<f32>,
    ) -> PostResult<Self> {
        if !rect.is_valid() {
            return Err(PostError::InvalidBox {
                reason: "corners must be finite with min <= max",
            });
        }
        if classes.is_empty() {
            return Err(PostError::InvalidClassCount { classes: 0 });
        }
        if !is_unit_interval(objectness) {
            return Err(PostError::InvalidBox {
                reason: "objectness must be finite and in [0, 1]",
            });
        }
        if !classes.iter().all(|&score| is_unit_interval(score)) {
            return Err(PostError::InvalidBox {
                reason: "class scores must be finite and in [0, 1]",
            });
        }
        Ok(Self {
            rect,
            objectness,
            classes: classes.into_boxed_slice(),
            space,
        })
    }

    /// Corner coordinates in the box's current space.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Coordinate space of [`RawBox::rect`].
    pub fn space(&self) -> CoordSpace {
        self.space
    }

    /// Objectness in `[0, 1]`.
    pub fn objectness(&self) -> f32 {
        self.objectness
    }

    /// Per-class confidences.
    pub fn classes(&self) -> &[f32] {
        &self.classes
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Confidence for class `class`, zero when out of range.
    pub fn class_score(&self, class: usize) -> f32 {
        self.classes.get(class).copied().unwrap_or(0.0)
    }

    /// Index of the highest class confidence (first on ties).
    pub fn label(&self) -> usize {
        argmax(&self.classes).0
    }

    /// Highest class confidence.
    pub fn score(&self) -> f32 {
        argmax(&self.classes).1
    }

    /// Integer rectangle, available once the box is in pixel space.
    pub fn pixel_rect(&self) -> Option<PixelRect> {
        match self.space {
            CoordSpace::Pixel => Some(PixelRect {
                xmin: self.rect.xmin as i32,
                ymin: self.rect.ymin as i32,
                xmax: self.rect.xmax as i32,
                ymax: self.rect.ymax as i32,
            }),
            CoordSpace::Normalized => None,
        }
    }

    pub(crate) fn set_pixel_rect(&mut self, rect: Rect) {
        self.rect = rect;
        self.space = CoordSpace::Pixel;
    }

    pub(crate) fn clear_class(&mut self, class: usize) {
        if let Some(score) = self.classes.get_mut(class) {
            *score = 0.0;
        }
    }
}

/// Decodes one detection scale into candidate boxes.
///
/// A box is emitted for every `(cell, anchor)` slot whose objectness is
/// strictly greater than `obj_thresh`. Class confidences at or below
/// `obj_thresh` are zeroed. Slots whose geometry overflows (non-finite
/// corners) are skipped.
pub fn decode_netout(
    netout: NetOutputView<'_>,
    anchors: &Anchors,
    obj_thresh: f32,
    net_h: usize,
    net_w: usize,
) -> PostResult<Vec<RawBox>> {
    if !is_unit_interval(obj_thresh) {
        return Err(PostError::InvalidThreshold {
            name: "obj_thresh",
            value: obj_thresh,
        });
    }
    if net_h == 0 || net_w == 0 {
        return Err(PostError::InvalidDimensions {
            height: net_h,
            width: net_w,
        });
    }
    if anchors.len() != netout.num_anchors() {
        return Err(PostError::AnchorCountMismatch {
            expected: netout.num_anchors(),
            got: anchors.len(),
        });
    }

    let grid_h = netout.grid_h();
    let grid_w = netout.grid_w();
    let _span = trace_span!(
        "decode_scale",
        grid_h = grid_h,
        grid_w = grid_w,
        anchors = anchors.len()
    )
    .entered();

    let mut boxes = Vec::new();
    for row in 0..grid_h {
        for col in 0..grid_w {
            for (b, (anchor_w, anchor_h)) in anchors.iter().enumerate() {
                let slot = netout.slot(row, col, b).ok_or_else(|| {
                    PostError::BufferLengthMismatch {
                        expected: grid_h * grid_w * anchors.len() * netout.channels(),
                        got: netout.as_slice().len(),
                    }
                })?;

                let objectness = sigmoid(slot[4]);
                if objectness.is_nan() || objectness <= obj_thresh {
                    continue;
                }

                let x = (col as f32 + sigmoid(slot[0])) / grid_w as f32;
                let y = (row as f32 + sigmoid(slot[1])) / grid_h as f32;
                let w = anchor_w * slot[2].exp() / net_w as f32;
                let h = anchor_h * slot[3].exp() / net_h as f32;
                let rect = Rect::from_center(x, y, w, h);
                if !rect.is_valid() {
                    trace_skip!(row, col, anchor = b, "skipping slot with non-finite geometry");
                    continue;
                }

                let classes: Vec<f32> = slot[5..]
                    .iter()
                    .map(|&logit| {
                        let conf = objectness * sigmoid(logit);
                        if conf > obj_thresh {
                            conf
                        } else {
                            0.0
                        }
                    })
                    .collect();

                boxes.push(RawBox {
                    rect,
                    objectness,
                    classes: classes.into_boxed_slice(),
                    space: CoordSpace::Normalized,
                });
            }
        }
    }

    trace_event!("decoded_boxes", count = boxes.len());
    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use super::{decode_netout, Anchors, CoordSpace, RawBox};
    use crate::geometry::Rect;
    use crate::tensor::NetOutputView;
    use crate::util::PostError;

    const LOW: f32 = -20.0;

    fn quiet_tensor(grid: usize, anchors: usize, classes: usize) -> Vec<f32> {
        let channels = 5 + classes;
        let mut data = vec![0.0f32; grid * grid * anchors * channels];
        for slot in data.chunks_exact_mut(channels) {
            slot[4] = LOW;
            for c in &mut slot[5..] {
                *c = LOW;
            }
        }
        data
    }

    fn logit(p: f32) -> f32 {
        (p / (1.0 - p)).ln()
    }

    #[test]
    fn emits_only_slots_above_threshold() {
        let (grid, na, nc) = (4, 2, 3);
        let channels = 5 + nc;
        let mut data = quiet_tensor(grid, na, nc);
        let idx = ((grid + 2) * na + 1) * channels;
        data[idx + 4] = logit(0.9);
        data[idx + 5 + 2] = 10.0;

        let view = NetOutputView::new(&data, grid, grid, na, channels, nc).unwrap();
        let anchors = Anchors::from_flat(&[8.0, 8.0, 16.0, 32.0]).unwrap();
        let boxes = decode_netout(view, &anchors, 0.5, 64, 64).unwrap();

        assert_eq!(boxes.len(), 1);
        let bx = &boxes[0];
        assert_eq!(bx.space(), CoordSpace::Normalized);
        assert!((bx.objectness() - 0.9).abs() < 1e-5);
        assert_eq!(bx.label(), 2);
        assert_eq!(bx.class_score(0), 0.0);

        // center (2 + 0.5) / 4, (1 + 0.5) / 4; size 16/64 x 32/64
        let r = bx.rect();
        assert!((r.xmin - (0.625 - 0.125)).abs() < 1e-6);
        assert!((r.xmax - (0.625 + 0.125)).abs() < 1e-6);
        assert!((r.ymin - (0.375 - 0.25)).abs() < 1e-6);
        assert!((r.ymax - (0.375 + 0.25)).abs() < 1e-6);
    }

    #[test]
    fn objectness_equal_to_threshold_is_rejected() {
        let (grid, na, nc) = (1, 1, 1);
        let mut data = quiet_tensor(grid, na, nc);
        data[4] = 0.0; // sigmoid(0) == 0.5
        let view = NetOutputView::new(&data, 1, 1, 1, 6, 1).unwrap();
        let anchors = Anchors::from_flat(&[1.0, 1.0]).unwrap();
        assert!(decode_netout(view, &anchors, 0.5, 10, 10).unwrap().is_empty());
    }

    #[test]
    fn class_scores_are_weighted_and_thresholded() {
        let mut data = quiet_tensor(1, 1, 2);
        data[4] = logit(0.8);
        data[5] = logit(0.5); // 0.4 after weighting, below threshold
        data[6] = 20.0; // ~0.8 after weighting
        let view = NetOutputView::new(&data, 1, 1, 1, 7, 2).unwrap();
        let anchors = Anchors::from_flat(&[1.0, 1.0]).unwrap();
        let boxes = decode_netout(view, &anchors, 0.5, 10, 10).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].classes()[0], 0.0);
        assert!((boxes[0].classes()[1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn overflowing_size_is_skipped() {
        let mut data = quiet_tensor(1, 1, 1);
        data[4] = 10.0;
        data[2] = 1000.0;
        let view = NetOutputView::new(&data, 1, 1, 1, 6, 1).unwrap();
        let anchors = Anchors::from_flat(&[1.0, 1.0]).unwrap();
        assert!(decode_netout(view, &anchors, 0.5, 10, 10).unwrap().is_empty());
    }

    #[test]
    fn nan_objectness_is_skipped() {
        let mut data = quiet_tensor(1, 1, 1);
        data[4] = f32::NAN;
        data[5] = 10.0;
        let view = NetOutputView::new(&data, 1, 1, 1, 6, 1).unwrap();
        let anchors = Anchors::from_flat(&[1.0, 1.0]).unwrap();
        assert!(decode_netout(view, &anchors, 0.0, 10, 10).unwrap().is_empty());
    }

    #[test]
    fn anchor_count_must_match_tensor() {
        let data = quiet_tensor(2, 3, 1);
        let view = NetOutputView::new(&data, 2, 2, 3, 6, 1).unwrap();
        let anchors = Anchors::from_flat(&[1.0, 1.0, 2.0, 2.0]).unwrap();
        assert_eq!(
            decode_netout(view, &anchors, 0.5, 10, 10).unwrap_err(),
            PostError::AnchorCountMismatch {
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn raw_box_rejects_inverted_corners() {
        let err = RawBox::new(Rect::new(0.5, 0.0, 0.4, 1.0), 0.9, vec![0.9]).unwrap_err();
        assert!(matches!(err, PostError::InvalidBox { .. }));
        assert!(RawBox::new(Rect::new(0.0, 0.0, 1.0, 1.0), 0.9, vec![]).is_err());
    }

    #[test]
    fn raw_box_rejects_scores_outside_unit_interval() {
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        for (objectness, classes) in [
            (7.0, vec![0.5]),
            (f32::NAN, vec![0.5]),
            (0.9, vec![-3.0, 0.5]),
            (0.9, vec![0.5, 5.0]),
            (0.9, vec![f32::NAN]),
        ] {
            assert!(matches!(
                RawBox::new(rect, objectness, classes).unwrap_err(),
                PostError::InvalidBox { .. }
            ));
        }
        assert!(RawBox::new(rect, 1.0, vec![0.0, 1.0]).is_ok());
    }

    #[test]
    fn label_and_score_follow_current_scores() {
        let mut bx = RawBox::new(Rect::new(0.0, 0.0, 1.0, 1.0), 0.9, vec![0.6, 0.8]).unwrap();
        assert_eq!((bx.label(), bx.score()), (1, 0.8));
        bx.clear_class(1);
        assert_eq!((bx.label(), bx.score()), (0, 0.6));
        assert!(bx.pixel_rect().is_none());
    }
}
