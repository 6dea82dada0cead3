//! Axis-aligned box geometry.
//!
//! `Rect` stores corner coordinates (`xmin <= xmax`, `ymin <= ymax`). The same
//! type is used for normalized network coordinates and for pixel coordinates;
//! which space a rectangle lives in is tracked by its owner.

pub mod letterbox;

pub use letterbox::Letterbox;

/// Axis-aligned rectangle given by its corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub xmin: f32,
    /// Top edge.
    pub ymin: f32,
    /// Right edge.
    pub xmax: f32,
    /// Bottom edge.
    pub ymax: f32,
}

impl Rect {
    /// Creates a rectangle from its corners.
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Creates a rectangle from its center and size.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            xmin: cx - width / 2.0,
            ymin: cy - height / 2.0,
            xmax: cx + width / 2.0,
            ymax: cy + height / 2.0,
        }
    }

    /// Width, clamped at zero.
    pub fn width(&self) -> f32 {
        (self.xmax - self.xmin).max(0.0)
    }

    /// Height, clamped at zero.
    pub fn height(&self) -> f32 {
        (self.ymax - self.ymin).max(0.0)
    }

    /// Area, zero for degenerate rectangles.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Returns true when all corners are finite and correctly ordered.
    pub fn is_valid(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
            && self.xmin <= self.xmax
            && self.ymin <= self.ymax
    }

    /// Intersection over union with another rectangle.
    pub fn iou(&self, other: &Rect) -> f32 {
        bbox_iou(self, other)
    }
}

/// Rectangle in whole image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub xmin: i32,
    /// Top edge.
    pub ymin: i32,
    /// Right edge.
    pub xmax: i32,
    /// Bottom edge.
    pub ymax: i32,
}

impl PixelRect {
    /// Width in pixels.
    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    /// Height in pixels.
    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }
}

/// Length of the overlap between two closed intervals `(lo, hi)`.
///
/// Disjoint intervals overlap by zero; containment yields the inner length.
pub fn interval_overlap(a: (f32, f32), b: (f32, f32)) -> f32 {
    let lo = a.0.max(b.0);
    let hi = a.1.min(b.1);
    (hi - lo).max(0.0)
}

/// Intersection over union of two rectangles, in `[0, 1]`.
///
/// Pairs whose union has no area (both degenerate) have an IoU of zero.
pub fn bbox_iou(a: &Rect, b: &Rect) -> f32 {
    let intersect_w = interval_overlap((a.xmin, a.xmax), (b.xmin, b.xmax));
    let intersect_h = interval_overlap((a.ymin, a.ymax), (b.ymin, b.ymax));
    let intersection = intersect_w * intersect_h;

    let union = a.area() + b.area() - intersection;
    if union.is_nan() || union <= 0.0 {
        return 0.0;
    }
    (intersection / union).clamp(0.0, 1.0)
}
