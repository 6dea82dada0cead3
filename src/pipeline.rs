//! End-to-end post-processing: decode -> remap -> suppress -> collect.

use crate::decode::{decode_netout, Anchors, RawBox};
use crate::detections::DetectionSet;
use crate::geometry::Letterbox;
use crate::remap::correct_boxes_with;
use crate::suppress::suppress;
#[cfg(feature = "rayon")]
use crate::suppress::suppress_par;
use crate::tensor::{NetOutputView, BOX_CHANNELS};
use crate::trace::{trace_event, trace_span};
use crate::util::math::is_unit_interval;
use crate::util::{PostError, PostResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Thresholds and network geometry for a detector.
#[derive(Clone, Debug, PartialEq)]
pub struct PostprocessConfig {
    /// Objectness and class-confidence floor (exclusive).
    pub obj_thresh: f32,
    /// IoU at or above which two same-class boxes are duplicates.
    pub nms_thresh: f32,
    /// Network input height in pixels.
    pub net_h: usize,
    /// Network input width in pixels.
    pub net_w: usize,
    /// Number of classes the detector predicts.
    pub num_classes: usize,
    /// Decode scales and suppress classes in parallel (requires `rayon`).
    pub parallel: bool,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            obj_thresh: 0.5,
            nms_thresh: 0.45,
            net_h: 416,
            net_w: 416,
            num_classes: 80,
            parallel: false,
        }
    }
}

impl PostprocessConfig {
    /// Checks thresholds, dimensions and class count.
    pub fn validate(&self) -> PostResult<()> {
        if !is_unit_interval(self.obj_thresh) {
            return Err(PostError::InvalidThreshold {
                name: "obj_thresh",
                value: self.obj_thresh,
            });
        }
        if !is_unit_interval(self.nms_thresh) {
            return Err(PostError::InvalidThreshold {
                name: "nms_thresh",
                value: self.nms_thresh,
            });
        }
        if self.net_h == 0 || self.net_w == 0 {
            return Err(PostError::InvalidDimensions {
                height: self.net_h,
                width: self.net_w,
            });
        }
        if self.num_classes == 0 {
            return Err(PostError::InvalidClassCount {
                classes: self.num_classes,
            });
        }
        Ok(())
    }
}

/// One detection scale: its raw output and the anchors it was trained with.
#[derive(Clone, Copy, Debug)]
pub struct ScaleOutput<'a> {
    /// Raw activations.
    pub netout: NetOutputView<'a>,
    /// Anchor priors, one pair per anchor slot.
    pub anchors: &'a Anchors,
}

impl<'a> ScaleOutput<'a> {
    /// Pairs a tensor view with its anchors.
    pub fn new(netout: NetOutputView<'a>, anchors: &'a Anchors) -> Self {
        Self { netout, anchors }
    }
}

/// Stateless post-processor; every call depends only on its inputs.
#[derive(Clone, Debug, Default)]
pub struct Postprocessor {
    cfg: PostprocessConfig,
}

impl Postprocessor {
    /// Creates a post-processor with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: PostprocessConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &PostprocessConfig {
        &self.cfg
    }

    /// Decodes all scales and concatenates their boxes in scale order.
    pub fn decode(&self, scales: &[ScaleOutput<'_>]) -> PostResult<Vec<RawBox>> {
        self.cfg.validate()?;
        self.check_scales(scales)?;
        self.decode_checked(scales)
    }

    /// Decodes, remaps to `image_h x image_w` pixels and suppresses duplicates.
    ///
    /// The returned boxes include suppressed ones; their losing class entries
    /// are zero.
    pub fn process_boxes(
        &self,
        scales: &[ScaleOutput<'_>],
        image_h: usize,
        image_w: usize,
    ) -> PostResult<Vec<RawBox>> {
        self.cfg.validate()?;
        let letterbox = Letterbox::fit(image_h, image_w, self.cfg.net_h, self.cfg.net_w)?;
        self.check_scales(scales)?;

        let _span = trace_span!(
            "postprocess",
            scales = scales.len(),
            image_h = image_h,
            image_w = image_w
        )
        .entered();

        let mut boxes = self.decode_checked(scales)?;
        correct_boxes_with(&mut boxes, &letterbox)?;
        self.suppress_boxes(&mut boxes)?;
        Ok(boxes)
    }

    /// Runs the full pipeline and collects detections above `obj_thresh`.
    pub fn process(
        &self,
        scales: &[ScaleOutput<'_>],
        image_h: usize,
        image_w: usize,
    ) -> PostResult<DetectionSet> {
        let boxes = self.process_boxes(scales, image_h, image_w)?;
        let set = DetectionSet::from_boxes(&boxes, self.cfg.obj_thresh)?;
        trace_event!("detections", count = set.len());
        Ok(set)
    }

    fn check_scales(&self, scales: &[ScaleOutput<'_>]) -> PostResult<()> {
        let expected = BOX_CHANNELS + self.cfg.num_classes;
        for scale in scales {
            if scale.netout.channels() != expected {
                return Err(PostError::ChannelMismatch {
                    expected,
                    got: scale.netout.channels(),
                });
            }
            if scale.anchors.len() != scale.netout.num_anchors() {
                return Err(PostError::AnchorCountMismatch {
                    expected: scale.netout.num_anchors(),
                    got: scale.anchors.len(),
                });
            }
        }
        Ok(())
    }

    fn decode_checked(&self, scales: &[ScaleOutput<'_>]) -> PostResult<Vec<RawBox>> {
        let cfg = &self.cfg;
        let decode_one = |scale: &ScaleOutput<'_>| {
            decode_netout(
                scale.netout,
                scale.anchors,
                cfg.obj_thresh,
                cfg.net_h,
                cfg.net_w,
            )
        };

        #[cfg(feature = "rayon")]
        {
            if cfg.parallel {
                let per_scale = scales
                    .par_iter()
                    .map(decode_one)
                    .collect::<PostResult<Vec<_>>>()?;
                return Ok(per_scale.into_iter().flatten().collect());
            }
        }

        let mut boxes = Vec::new();
        for scale in scales {
            boxes.extend(decode_one(scale)?);
        }
        Ok(boxes)
    }

    fn suppress_boxes(&self, boxes: &mut [RawBox]) -> PostResult<usize> {
        #[cfg(feature = "rayon")]
        {
            if self.cfg.parallel {
                return suppress_par(boxes, self.cfg.nms_thresh);
            }
        }
        suppress(boxes, self.cfg.nms_thresh)
    }
}
