//! Image helpers around the detector input, via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. The post-processing core
//! never touches pixels; these helpers exist for callers that also prepare the
//! network input or only need an image's size.

use crate::geometry::Letterbox;
use crate::util::{PostError, PostResult};
use image::imageops::{self, FilterType};
use image::DynamicImage;
use std::path::Path;

/// Padding value of the letterbox border, in `[0, 1]` intensity units.
pub const LETTERBOX_FILL: f32 = 0.5;

/// Reads an image header and returns its `(height, width)`.
pub fn image_dimensions<P: AsRef<Path>>(path: P) -> PostResult<(usize, usize)> {
    let (width, height) = image::image_dimensions(path).map_err(|err| PostError::ImageIo {
        reason: err.to_string(),
    })?;
    Ok((height as usize, width as usize))
}

/// Letterboxes an image into a row-major `net_h x net_w x 3` RGB buffer with
/// values in `[0, 1]`, padded with [`LETTERBOX_FILL`].
pub fn letterbox_image(
    img: &DynamicImage,
    net_h: usize,
    net_w: usize,
) -> PostResult<(Vec<f32>, Letterbox)> {
    let rgb = img.to_rgb8();
    let letterbox = Letterbox::fit(rgb.height() as usize, rgb.width() as usize, net_h, net_w)?;
    let (new_h, new_w) = letterbox.scaled_size();
    let (pad_top, pad_left) = letterbox.padding();

    let resized = imageops::resize(&rgb, new_w as u32, new_h as u32, FilterType::Triangle);
    let mut data = vec![LETTERBOX_FILL; net_h * net_w * 3];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let base = ((pad_top + y as usize) * net_w + pad_left + x as usize) * 3;
        for (dst, &value) in data[base..base + 3].iter_mut().zip(pixel.0.iter()) {
            *dst = value as f32 / 255.0;
        }
    }
    Ok((data, letterbox))
}

/// Loads an image from disk and letterboxes it.
pub fn load_letterboxed<P: AsRef<Path>>(
    path: P,
    net_h: usize,
    net_w: usize,
) -> PostResult<(Vec<f32>, Letterbox)> {
    let img = image::open(path).map_err(|err| PostError::ImageIo {
        reason: err.to_string(),
    })?;
    letterbox_image(&img, net_h, net_w)
}
