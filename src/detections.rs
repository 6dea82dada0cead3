//! Final per-class detections handed to renderers and trackers.

use crate::decode::{CoordSpace, RawBox};
use crate::geometry::PixelRect;
use crate::util::math::{is_unit_interval, score_cmp_desc};
use crate::util::{PostError, PostResult};
use std::collections::BTreeMap;

/// One surviving `(box, class)` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Class index.
    pub class_id: usize,
    /// Confidence for `class_id`.
    pub score: f32,
    /// Box in original image pixels.
    pub rect: PixelRect,
    /// Position of the source box in the decoded batch.
    pub box_index: usize,
}

/// Surviving detections grouped by class.
///
/// Within a class, detections are ordered by descending score; equal scores
/// keep decode order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionSet {
    by_class: BTreeMap<usize, Vec<Detection>>,
}

impl DetectionSet {
    /// Collects every `(box, class)` pair whose confidence is strictly above
    /// `conf_thresh`. Boxes must already be in pixel space.
    pub fn from_boxes(boxes: &[RawBox], conf_thresh: f32) -> PostResult<Self> {
        if !is_unit_interval(conf_thresh) {
            return Err(PostError::InvalidThreshold {
                name: "conf_thresh",
                value: conf_thresh,
            });
        }

        let mut by_class: BTreeMap<usize, Vec<Detection>> = BTreeMap::new();
        for (box_index, bx) in boxes.iter().enumerate() {
            let rect = bx.pixel_rect().ok_or(PostError::CoordSpaceMismatch {
                expected: CoordSpace::Pixel,
                got: bx.space(),
            })?;
            for (class_id, &score) in bx.classes().iter().enumerate() {
                if score > conf_thresh {
                    by_class.entry(class_id).or_default().push(Detection {
                        class_id,
                        score,
                        rect,
                        box_index,
                    });
                }
            }
        }
        for detections in by_class.values_mut() {
            detections.sort_by(|a, b| score_cmp_desc(a.score, b.score));
        }

        Ok(Self { by_class })
    }

    /// Detections for one class, best first.
    pub fn get(&self, class_id: usize) -> &[Detection] {
        self.by_class
            .get(&class_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Classes with at least one detection, ascending.
    pub fn classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_class.keys().copied()
    }

    /// Iterates over `(class_id, detections)` in ascending class order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Detection])> + '_ {
        self.by_class.iter().map(|(&c, d)| (c, d.as_slice()))
    }

    /// Total number of detections across classes.
    pub fn len(&self) -> usize {
        self.by_class.values().map(Vec::len).sum()
    }

    /// Returns true when no class has a detection.
    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    /// All detections, best first across classes.
    pub fn to_vec(&self) -> Vec<Detection> {
        let mut all: Vec<Detection> = self.by_class.values().flatten().copied().collect();
        all.sort_by(|a, b| score_cmp_desc(a.score, b.score));
        all
    }

    /// Consumes the set into its class map.
    pub fn into_map(self) -> BTreeMap<usize, Vec<Detection>> {
        self.by_class
    }
}

#[cfg(test)]
mod tests {
    use super::DetectionSet;
    use crate::decode::{CoordSpace, RawBox};
    use crate::geometry::Rect;
    use crate::util::PostError;

    fn pixel_box(x: f32, classes: Vec<f32>) -> RawBox {
        RawBox::new_in(
            CoordSpace::Pixel,
            Rect::new(x, 0.0, x + 10.0, 10.0),
            0.9,
            classes,
        )
        .unwrap()
    }

    #[test]
    fn groups_by_class_and_orders_by_score() {
        let boxes = vec![
            pixel_box(0.0, vec![0.6, 0.0]),
            pixel_box(20.0, vec![0.9, 0.7]),
            pixel_box(40.0, vec![0.0, 0.55]),
        ];
        let set = DetectionSet::from_boxes(&boxes, 0.5).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.classes().collect::<Vec<_>>(), vec![0, 1]);

        let class0 = set.get(0);
        assert_eq!(class0[0].box_index, 1);
        assert_eq!(class0[1].box_index, 0);
        assert_eq!(class0[1].rect.xmin, 0);
        assert_eq!(set.get(1).len(), 2);
        assert!(set.get(7).is_empty());
        assert_eq!(set.to_vec()[0].score, 0.9);
    }

    #[test]
    fn threshold_is_strict() {
        let boxes = vec![pixel_box(0.0, vec![0.5])];
        assert!(DetectionSet::from_boxes(&boxes, 0.5).unwrap().is_empty());
    }

    #[test]
    fn normalized_boxes_are_rejected() {
        let boxes = vec![RawBox::new(Rect::new(0.0, 0.0, 0.5, 0.5), 0.9, vec![0.9]).unwrap()];
        assert_eq!(
            DetectionSet::from_boxes(&boxes, 0.5).unwrap_err(),
            PostError::CoordSpaceMismatch {
                expected: CoordSpace::Pixel,
                got: CoordSpace::Normalized
            }
        );
    }
}
