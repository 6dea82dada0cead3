//! Shape-checked views over raw detector output.
//!
//! A detection scale is a row-major `grid_h x grid_w x anchors x (5 + classes)`
//! buffer of raw activations: `tx, ty, tw, th, objectness, class logits...`.
//! Detectors usually emit the anchor and channel axes fused into one
//! `anchors * (5 + classes)` axis; `NetOutputView::from_fused` accepts that
//! layout and checks that it splits evenly. Buffers are borrowed, never copied,
//! and never reshaped to fit.

use crate::util::{PostError, PostResult};

/// Channels preceding the class scores: x, y, w, h, objectness.
pub const BOX_CHANNELS: usize = 5;

/// Borrowed view of one detection scale.
#[derive(Copy, Clone, Debug)]
pub struct NetOutputView<'a> {
    data: &'a [f32],
    grid_h: usize,
    grid_w: usize,
    num_anchors: usize,
    num_classes: usize,
}

impl<'a> NetOutputView<'a> {
    /// Creates a view over a `grid_h x grid_w x num_anchors x channels` buffer.
    ///
    /// `channels` must equal `5 + num_classes`.
    pub fn new(
        data: &'a [f32],
        grid_h: usize,
        grid_w: usize,
        num_anchors: usize,
        channels: usize,
        num_classes: usize,
    ) -> PostResult<Self> {
        if grid_h == 0 || grid_w == 0 {
            return Err(PostError::InvalidDimensions {
                height: grid_h,
                width: grid_w,
            });
        }
        if num_anchors == 0 {
            return Err(PostError::InvalidAnchors {
                reason: "at least one anchor per cell is required",
            });
        }
        if num_classes == 0 {
            return Err(PostError::InvalidClassCount {
                classes: num_classes,
            });
        }
        let expected_channels = BOX_CHANNELS + num_classes;
        if channels != expected_channels {
            return Err(PostError::ChannelMismatch {
                expected: expected_channels,
                got: channels,
            });
        }

        let expected = grid_h
            .checked_mul(grid_w)
            .and_then(|v| v.checked_mul(num_anchors))
            .and_then(|v| v.checked_mul(channels))
            .ok_or(PostError::InvalidDimensions {
                height: grid_h,
                width: grid_w,
            })?;
        if data.len() != expected {
            return Err(PostError::BufferLengthMismatch {
                expected,
                got: data.len(),
            });
        }

        Ok(Self {
            data,
            grid_h,
            grid_w,
            num_anchors,
            num_classes,
        })
    }

    /// Creates a view over a `grid_h x grid_w x fused` buffer where the last
    /// axis packs `num_anchors` blocks of `5 + num_classes` channels.
    pub fn from_fused(
        data: &'a [f32],
        grid_h: usize,
        grid_w: usize,
        fused_channels: usize,
        num_anchors: usize,
        num_classes: usize,
    ) -> PostResult<Self> {
        let per_anchor = BOX_CHANNELS + num_classes;
        let expected = num_anchors.saturating_mul(per_anchor);
        if fused_channels != expected {
            return Err(PostError::ChannelMismatch {
                expected,
                got: fused_channels,
            });
        }
        Self::new(data, grid_h, grid_w, num_anchors, per_anchor, num_classes)
    }

    /// Grid height (rows).
    pub fn grid_h(&self) -> usize {
        self.grid_h
    }

    /// Grid width (columns).
    pub fn grid_w(&self) -> usize {
        self.grid_w
    }

    /// Anchors predicted per grid cell.
    pub fn num_anchors(&self) -> usize {
        self.num_anchors
    }

    /// Number of class channels.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Channels per anchor slot (`5 + num_classes`).
    pub fn channels(&self) -> usize {
        BOX_CHANNELS + self.num_classes
    }

    /// The full backing buffer.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Raw activations for one `(row, col, anchor)` slot.
    pub fn slot(&self, row: usize, col: usize, anchor: usize) -> Option<&'a [f32]> {
        if row >= self.grid_h || col >= self.grid_w || anchor >= self.num_anchors {
            return None;
        }
        let channels = self.channels();
        let start = ((row * self.grid_w + col) * self.num_anchors + anchor) * channels;
        self.data.get(start..start + channels)
    }

    /// All anchor slots of one grid row, `grid_w * num_anchors * channels` values.
    pub fn row(&self, row: usize) -> Option<&'a [f32]> {
        if row >= self.grid_h {
            return None;
        }
        let len = self.grid_w * self.num_anchors * self.channels();
        let start = row * len;
        self.data.get(start..start + len)
    }
}

#[cfg(test)]
mod tests {
    use super::NetOutputView;
    use crate::util::PostError;

    #[test]
    fn slot_indexes_row_major() {
        let channels = 7;
        let data: Vec<f32> = (0..2 * 3 * 2 * channels).map(|v| v as f32).collect();
        let view = NetOutputView::new(&data, 2, 3, 2, channels, 2).unwrap();

        let slot = view.slot(1, 2, 1).unwrap();
        let start = ((3 + 2) * 2 + 1) * channels;
        assert_eq!(slot[0], start as f32);
        assert_eq!(slot.len(), channels);
        assert!(view.slot(2, 0, 0).is_none());
        assert!(view.slot(0, 0, 2).is_none());
        assert_eq!(view.row(1).unwrap()[0], (3 * 2 * channels) as f32);
    }

    #[test]
    fn fused_layout_must_split_evenly() {
        let data = vec![0.0f32; 13 * 13 * 255];
        let view = NetOutputView::from_fused(&data, 13, 13, 255, 3, 80).unwrap();
        assert_eq!(view.channels(), 85);
        assert_eq!(view.num_anchors(), 3);

        let err = NetOutputView::from_fused(&data, 13, 13, 255, 3, 79).unwrap_err();
        assert_eq!(
            err,
            PostError::ChannelMismatch {
                expected: 252,
                got: 255
            }
        );
    }

    #[test]
    fn buffer_is_never_truncated() {
        let data = vec![0.0f32; 2 * 2 * 3 * 85 + 1];
        let err = NetOutputView::new(&data, 2, 2, 3, 85, 80).unwrap_err();
        assert_eq!(
            err,
            PostError::BufferLengthMismatch {
                expected: 2 * 2 * 3 * 85,
                got: 2 * 2 * 3 * 85 + 1
            }
        );
    }
}
