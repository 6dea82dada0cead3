//! Checks that the bundled CLI example configuration matches library defaults.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use yolopost::{Anchors, PostprocessConfig, YOLOV3_ANCHORS};

/// Postprocess block of the CLI config.
#[derive(Debug, Deserialize)]
struct PostprocessJson {
    obj_thresh: f32,
    nms_thresh: f32,
    net_h: usize,
    net_w: usize,
    num_classes: usize,
    parallel: bool,
}

#[derive(Debug, Deserialize)]
struct ScaleJson {
    grid_h: usize,
    grid_w: usize,
    anchors: Vec<f32>,
}

/// CLI config (partial - only what we need).
#[derive(Debug, Deserialize)]
struct ConfigJson {
    postprocess: PostprocessJson,
    scales: Vec<ScaleJson>,
}

fn load_example() -> ConfigJson {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("yolopost-cli/config.example.json");
    let text = fs::read_to_string(&path).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn example_postprocess_block_is_the_default_config() {
    let pp = load_example().postprocess;
    let cfg = PostprocessConfig {
        obj_thresh: pp.obj_thresh,
        nms_thresh: pp.nms_thresh,
        net_h: pp.net_h,
        net_w: pp.net_w,
        num_classes: pp.num_classes,
        parallel: pp.parallel,
    };
    assert_eq!(cfg, PostprocessConfig::default());
    assert!(cfg.validate().is_ok());
}

#[test]
fn example_scales_use_yolov3_anchors_coarsest_first() {
    let cfg = load_example();
    assert_eq!(cfg.scales.len(), 3);

    let defaults = Anchors::yolov3().unwrap();
    for (idx, scale) in cfg.scales.iter().enumerate() {
        assert_eq!(scale.anchors.as_slice(), &YOLOV3_ANCHORS[idx][..]);
        assert_eq!(Anchors::from_flat(&scale.anchors).unwrap(), defaults[idx]);
        assert_eq!(scale.grid_h, 13 << idx);
        assert_eq!(scale.grid_w, (cfg.postprocess.net_w / 32) << idx);
    }
}
