//! Class-wise greedy non-maximum suppression.
//!
//! Each class is handled independently: boxes are ranked by their confidence
//! for that class (ties keep decode order), and every lower-ranked box whose
//! IoU with a surviving box reaches `nms_thresh` has its confidence for that
//! class set to zero. Boxes are never removed, so a box can survive for one
//! class while being suppressed for another.

use crate::decode::RawBox;
use crate::geometry::{bbox_iou, Rect};
use crate::trace::{trace_event, trace_span};
use crate::util::math::{is_unit_interval, score_cmp_desc};
use crate::util::{PostError, PostResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Suppresses duplicate detections in place and returns how many
/// `(box, class)` entries were zeroed.
///
/// An empty batch is a no-op.
pub fn suppress(boxes: &mut [RawBox], nms_thresh: f32) -> PostResult<usize> {
    let num_classes = check_batch(boxes, nms_thresh)?;
    let _span = trace_span!("suppress", boxes = boxes.len(), classes = num_classes).entered();

    let rects: Vec<Rect> = boxes.iter().map(RawBox::rect).collect();
    let mut zeroed = 0usize;
    for class in 0..num_classes {
        let losers = class_losers(boxes, &rects, class, nms_thresh);
        zeroed += losers.len();
        for idx in losers {
            boxes[idx].clear_class(class);
        }
    }

    trace_event!("suppressed_pairs", count = zeroed);
    Ok(zeroed)
}

/// Class-parallel variant of [`suppress`] with identical results.
///
/// Each class column is decided on a shared read-only view of the batch; the
/// zeroing is applied once every class has been decided.
#[cfg(feature = "rayon")]
pub fn suppress_par(boxes: &mut [RawBox], nms_thresh: f32) -> PostResult<usize> {
    let num_classes = check_batch(boxes, nms_thresh)?;
    let _span = trace_span!("suppress", boxes = boxes.len(), classes = num_classes).entered();

    let rects: Vec<Rect> = boxes.iter().map(RawBox::rect).collect();
    let decided: Vec<(usize, Vec<usize>)> = {
        let view: &[RawBox] = &*boxes;
        (0..num_classes)
            .into_par_iter()
            .map(|class| (class, class_losers(view, &rects, class, nms_thresh)))
            .collect()
    };

    let mut zeroed = 0usize;
    for (class, losers) in decided {
        zeroed += losers.len();
        for idx in losers {
            boxes[idx].clear_class(class);
        }
    }

    trace_event!("suppressed_pairs", count = zeroed);
    Ok(zeroed)
}

/// Validates the threshold, coordinate spaces and class-vector lengths;
/// returns the class count.
fn check_batch(boxes: &[RawBox], nms_thresh: f32) -> PostResult<usize> {
    if !is_unit_interval(nms_thresh) {
        return Err(PostError::InvalidThreshold {
            name: "nms_thresh",
            value: nms_thresh,
        });
    }
    let Some(first) = boxes.first() else {
        return Ok(0);
    };
    let expected = first.num_classes();
    for (index, bx) in boxes.iter().enumerate() {
        if bx.space() != first.space() {
            return Err(PostError::CoordSpaceMismatch {
                expected: first.space(),
                got: bx.space(),
            });
        }
        if bx.num_classes() != expected {
            return Err(PostError::ClassVectorMismatch {
                index,
                expected,
                got: bx.num_classes(),
            });
        }
    }
    Ok(expected)
}

/// Indices of boxes that lose their `class` confidence.
fn class_losers(boxes: &[RawBox], rects: &[Rect], class: usize, nms_thresh: f32) -> Vec<usize> {
    let mut scores: Vec<f32> = boxes.iter().map(|b| b.class_score(class)).collect();
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| score_cmp_desc(scores[a], scores[b]));

    let mut losers = Vec::new();
    for (rank, &i) in order.iter().enumerate() {
        if scores[i] <= 0.0 {
            continue;
        }
        for &j in &order[rank + 1..] {
            if scores[j] <= 0.0 {
                continue;
            }
            if bbox_iou(&rects[i], &rects[j]) >= nms_thresh {
                scores[j] = 0.0;
                losers.push(j);
            }
        }
    }
    losers
}
