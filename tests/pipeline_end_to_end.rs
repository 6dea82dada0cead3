use yolopost::{
    Anchors, CoordSpace, NetOutputView, PixelRect, PostprocessConfig, Postprocessor,
    ScaleOutput,
};

const CLASSES: usize = 80;
const CHANNELS: usize = 5 + CLASSES;
const QUIET: f32 = -20.0;

/// A scale where every slot is confidently empty.
fn quiet_scale(grid: usize) -> Vec<f32> {
    vec![QUIET; grid * grid * 3 * CHANNELS]
}

/// Writes one object prediction into `(row, col, anchor)`.
fn place(
    data: &mut [f32],
    grid: usize,
    (row, col, anchor): (usize, usize, usize),
    offsets: [f32; 4],
    objectness_logit: f32,
    class_logits: &[(usize, f32)],
) {
    let start = ((row * grid + col) * 3 + anchor) * CHANNELS;
    let slot = &mut data[start..start + CHANNELS];
    slot[..4].copy_from_slice(&offsets);
    slot[4] = objectness_logit;
    for &(class, logit) in class_logits {
        slot[5 + class] = logit;
    }
}

#[test]
fn single_object_on_hd_frame() {
    let anchors = Anchors::yolov3().unwrap();
    let mut coarse = quiet_scale(13);
    // objectness 0.9, class 3 conditional 8/9 so its confidence is 0.8
    place(
        &mut coarse,
        13,
        (6, 6, 0),
        [0.0; 4],
        9.0f32.ln(),
        &[(3, 8.0f32.ln())],
    );
    let view = NetOutputView::from_fused(&coarse, 13, 13, 255, 3, CLASSES).unwrap();

    let post = Postprocessor::new();
    let set = post
        .process(&[ScaleOutput::new(view, &anchors[0])], 1080, 1920)
        .unwrap();

    assert_eq!(set.len(), 1);
    assert_eq!(set.classes().collect::<Vec<_>>(), vec![3]);
    let det = set.get(3)[0];
    assert!((det.score - 0.8).abs() < 1e-4);
    assert_eq!(det.box_index, 0);
    assert_eq!(
        det.rect,
        PixelRect {
            xmin: 692,
            ymin: 332,
            xmax: 1227,
            ymax: 747,
        }
    );
}

#[test]
fn duplicate_across_scales_is_suppressed_per_class() {
    let anchors = Anchors::yolov3().unwrap();
    let mut coarse = quiet_scale(13);
    let mut medium = quiet_scale(26);
    let mut fine = quiet_scale(52);

    place(
        &mut coarse,
        13,
        (6, 6, 0),
        [0.0; 4],
        9.0f32.ln(),
        &[(3, 8.0f32.ln())],
    );
    // Same object seen by the 26x26 scale, slightly offset and with a lower
    // class 3 score, plus a confident class 7.
    place(
        &mut medium,
        26,
        (12, 12, 1),
        [0.0, 0.0, (116.0f32 / 62.0).ln(), 2.0f32.ln()],
        9.0f32.ln(),
        &[(3, 3.5f32.ln()), (7, 8.0f32.ln())],
    );
    // An unrelated small object in the corner.
    place(
        &mut fine,
        52,
        (2, 2, 0),
        [0.0; 4],
        9.0f32.ln(),
        &[(0, 8.0f32.ln())],
    );

    let scales = [
        ScaleOutput::new(
            NetOutputView::from_fused(&coarse, 13, 13, 255, 3, CLASSES).unwrap(),
            &anchors[0],
        ),
        ScaleOutput::new(
            NetOutputView::from_fused(&medium, 26, 26, 255, 3, CLASSES).unwrap(),
            &anchors[1],
        ),
        ScaleOutput::new(
            NetOutputView::from_fused(&fine, 52, 52, 255, 3, CLASSES).unwrap(),
            &anchors[2],
        ),
    ];

    let post = Postprocessor::new();
    let boxes = post.process_boxes(&scales, 416, 416).unwrap();
    assert_eq!(boxes.len(), 3);
    assert!(boxes.iter().all(|b| b.space() == CoordSpace::Pixel));
    assert_eq!(boxes[1].class_score(3), 0.0);
    assert!(boxes[1].class_score(7) > 0.7);

    let set = post.process(&scales, 416, 416).unwrap();
    assert_eq!(set.classes().collect::<Vec<_>>(), vec![0, 3, 7]);
    assert_eq!(set.len(), 3);
    assert_eq!(set.get(3)[0].box_index, 0);
    assert_eq!(set.get(7)[0].box_index, 1);
    assert_eq!(set.get(0)[0].box_index, 2);

    let small = set.get(0)[0].rect;
    assert!(small.xmax < 60 && small.ymax < 60);
}

#[test]
fn raising_the_threshold_drops_weak_detections() {
    let anchors = Anchors::yolov3().unwrap();
    let mut coarse = quiet_scale(13);
    place(
        &mut coarse,
        13,
        (3, 9, 2),
        [0.0; 4],
        9.0f32.ln(),
        &[(1, 8.0f32.ln()), (2, 1.0)],
    );
    let view = NetOutputView::from_fused(&coarse, 13, 13, 255, 3, CLASSES).unwrap();
    let scales = [ScaleOutput::new(view, &anchors[0])];

    let lenient = Postprocessor::new().process(&scales, 416, 416).unwrap();
    assert_eq!(lenient.classes().collect::<Vec<_>>(), vec![1, 2]);

    let strict = Postprocessor::new()
        .with_config(PostprocessConfig {
            obj_thresh: 0.75,
            ..PostprocessConfig::default()
        })
        .process(&scales, 416, 416)
        .unwrap();
    assert_eq!(strict.classes().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn quiet_output_yields_nothing() {
    let anchors = Anchors::yolov3().unwrap();
    let coarse = quiet_scale(13);
    let view = NetOutputView::from_fused(&coarse, 13, 13, 255, 3, CLASSES).unwrap();
    let set = Postprocessor::new()
        .process(&[ScaleOutput::new(view, &anchors[0])], 720, 1280)
        .unwrap();
    assert!(set.is_empty());
}
