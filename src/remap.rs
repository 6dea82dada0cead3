//! Mapping decoded boxes back onto the original image.

use crate::decode::{CoordSpace, RawBox};
use crate::geometry::{Letterbox, Rect};
use crate::util::{PostError, PostResult};

/// Rewrites normalized network coordinates as whole image pixels, in place.
///
/// Inverts the letterbox layout of an `image_h x image_w` image inside an
/// `net_h x net_w` input: each coordinate becomes
/// `trunc((normalized - offset) / scale * image_dim)`. The whole batch is
/// checked before any box is modified, so a box already in pixel space leaves
/// the batch untouched.
pub fn correct_boxes(
    boxes: &mut [RawBox],
    image_h: usize,
    image_w: usize,
    net_h: usize,
    net_w: usize,
) -> PostResult<()> {
    let letterbox = Letterbox::fit(image_h, image_w, net_h, net_w)?;
    correct_boxes_with(boxes, &letterbox)
}

/// Same as [`correct_boxes`] with a precomputed letterbox layout.
pub fn correct_boxes_with(boxes: &mut [RawBox], letterbox: &Letterbox) -> PostResult<()> {
    if let Some(bx) = boxes.iter().find(|b| b.space() != CoordSpace::Normalized) {
        return Err(PostError::CoordSpaceMismatch {
            expected: CoordSpace::Normalized,
            got: bx.space(),
        });
    }

    for bx in boxes.iter_mut() {
        let r = bx.rect();
        let (xmin, ymin) = letterbox.to_image(r.xmin as f64, r.ymin as f64);
        let (xmax, ymax) = letterbox.to_image(r.xmax as f64, r.ymax as f64);
        bx.set_pixel_rect(Rect::new(
            to_pixel(xmin),
            to_pixel(ymin),
            to_pixel(xmax),
            to_pixel(ymax),
        ));
    }
    Ok(())
}

/// Truncates toward zero and saturates to the `i32` range.
fn to_pixel(value: f64) -> f32 {
    value.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as f32
}
