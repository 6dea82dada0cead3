//! Letterbox (resize with preserved aspect ratio, then pad) geometry.
//!
//! The detector input is produced by scaling the image so that its binding
//! axis fills the network input, truncating the other axis to whole pixels,
//! and centring the result with `(net - new) / 2` pixels of padding on the
//! leading edge. `Letterbox` records that layout so that normalized network
//! coordinates can be mapped back to image pixels exactly.

use crate::util::{PostError, PostResult};

/// Layout of an image embedded in the network input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Letterbox {
    image_h: usize,
    image_w: usize,
    net_h: usize,
    net_w: usize,
    new_h: usize,
    new_w: usize,
    pad_top: usize,
    pad_left: usize,
}

impl Letterbox {
    /// Computes the letterbox layout of an `image_h x image_w` image inside an
    /// `net_h x net_w` network input.
    pub fn fit(image_h: usize, image_w: usize, net_h: usize, net_w: usize) -> PostResult<Self> {
        if image_h == 0 || image_w == 0 {
            return Err(PostError::InvalidDimensions {
                height: image_h,
                width: image_w,
            });
        }
        if net_h == 0 || net_w == 0 {
            return Err(PostError::InvalidDimensions {
                height: net_h,
                width: net_w,
            });
        }

        // net_w / image_w < net_h / image_h, compared without rounding.
        let width_binds = (net_w as u128) * (image_h as u128) < (net_h as u128) * (image_w as u128);
        let (new_h, new_w) = if width_binds {
            let new_h = (image_h as u128 * net_w as u128 / image_w as u128) as usize;
            (new_h.clamp(1, net_h), net_w)
        } else {
            let new_w = (image_w as u128 * net_h as u128 / image_h as u128) as usize;
            (net_h, new_w.clamp(1, net_w))
        };

        Ok(Self {
            image_h,
            image_w,
            net_h,
            net_w,
            new_h,
            new_w,
            pad_top: (net_h - new_h) / 2,
            pad_left: (net_w - new_w) / 2,
        })
    }

    /// Original image size as `(height, width)`.
    pub fn image_size(&self) -> (usize, usize) {
        (self.image_h, self.image_w)
    }

    /// Network input size as `(height, width)`.
    pub fn net_size(&self) -> (usize, usize) {
        (self.net_h, self.net_w)
    }

    /// Size of the resized image inside the network input as `(height, width)`.
    pub fn scaled_size(&self) -> (usize, usize) {
        (self.new_h, self.new_w)
    }

    /// Padding before the resized image as `(top, left)` pixels.
    pub fn padding(&self) -> (usize, usize) {
        (self.pad_top, self.pad_left)
    }

    /// Normalized offset and scale along x.
    pub fn x_offset_scale(&self) -> (f64, f64) {
        offset_scale(self.pad_left, self.new_w, self.net_w)
    }

    /// Normalized offset and scale along y.
    pub fn y_offset_scale(&self) -> (f64, f64) {
        offset_scale(self.pad_top, self.new_h, self.net_h)
    }

    /// Maps an image pixel position to normalized network coordinates.
    pub fn to_network(&self, x: f64, y: f64) -> (f64, f64) {
        let (x_offset, x_scale) = self.x_offset_scale();
        let (y_offset, y_scale) = self.y_offset_scale();
        (
            x / self.image_w as f64 * x_scale + x_offset,
            y / self.image_h as f64 * y_scale + y_offset,
        )
    }

    /// Maps normalized network coordinates to (unrounded) image pixels.
    pub fn to_image(&self, nx: f64, ny: f64) -> (f64, f64) {
        let (x_offset, x_scale) = self.x_offset_scale();
        let (y_offset, y_scale) = self.y_offset_scale();
        (
            (nx - x_offset) / x_scale * self.image_w as f64,
            (ny - y_offset) / y_scale * self.image_h as f64,
        )
    }
}

fn offset_scale(pad: usize, new_dim: usize, net_dim: usize) -> (f64, f64) {
    let net = net_dim as f64;
    (pad as f64 / net, new_dim as f64 / net)
}
