use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yolopost::classes::DEFAULT_COLOR_SEED;
use yolopost::io::image_dimensions;
use yolopost::{
    Anchors, ClassTable, Detection, NetOutputView, PostprocessConfig, Postprocessor, ScaleOutput,
    YOLOV3_ANCHORS,
};

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "YOLO detection post-processing (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for the pipeline stages.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PostprocessConfigJson {
    obj_thresh: f32,
    nms_thresh: f32,
    net_h: usize,
    net_w: usize,
    num_classes: usize,
    parallel: bool,
}

impl Default for PostprocessConfigJson {
    fn default() -> Self {
        let cfg = PostprocessConfig::default();
        Self {
            obj_thresh: cfg.obj_thresh,
            nms_thresh: cfg.nms_thresh,
            net_h: cfg.net_h,
            net_w: cfg.net_w,
            num_classes: cfg.num_classes,
            parallel: cfg.parallel,
        }
    }
}

impl From<&PostprocessConfigJson> for PostprocessConfig {
    fn from(value: &PostprocessConfigJson) -> Self {
        Self {
            obj_thresh: value.obj_thresh,
            nms_thresh: value.nms_thresh,
            net_h: value.net_h,
            net_w: value.net_w,
            num_classes: value.num_classes,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
struct ImageSize {
    height: usize,
    width: usize,
}

#[derive(Debug, Deserialize)]
struct ScaleJson {
    /// Raw little-endian f32 dump of one detection scale.
    tensor_path: String,
    grid_h: usize,
    grid_w: usize,
    /// Flat `(w, h)` anchor pairs; defaults to the YOLOv3 set for this scale.
    #[serde(default)]
    anchors: Option<Vec<f32>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    image_size: Option<ImageSize>,
    image_path: Option<String>,
    class_names_path: Option<String>,
    postprocess: PostprocessConfigJson,
    scales: Vec<ScaleJson>,
    output_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    class_id: usize,
    class_name: Option<String>,
    color: Option<[u8; 3]>,
    score: f32,
    xmin: i32,
    ymin: i32,
    xmax: i32,
    ymax: i32,
}

impl DetectionRecord {
    fn new(det: &Detection, classes: Option<&ClassTable>) -> Self {
        Self {
            class_id: det.class_id,
            class_name: classes
                .and_then(|t| t.name(det.class_id))
                .map(str::to_owned),
            color: classes.and_then(|t| t.color(det.class_id)),
            score: det.score,
            xmin: det.rect.xmin,
            ymin: det.rect.ymin,
            xmax: det.rect.xmax,
            ymax: det.rect.ymax,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    image: ImageSize,
    detections: Vec<DetectionRecord>,
}

fn read_tensor(path: &str) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(format!("{path}: length {} is not a multiple of 4", bytes.len()).into());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn load_classes(config: &Config) -> Result<Option<ClassTable>, Box<dyn std::error::Error>> {
    match &config.class_names_path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(Some(ClassTable::from_lines(&text, DEFAULT_COLOR_SEED)?))
        }
        None if config.postprocess.num_classes == 80 => Ok(Some(ClassTable::coco())),
        None => Ok(None),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("yolopost=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.scales.is_empty() {
        return Err("at least one entry in scales is required".into());
    }

    let image = match (config.image_size, &config.image_path) {
        (Some(size), _) => size,
        (None, Some(path)) => {
            let (height, width) = image_dimensions(path)?;
            ImageSize { height, width }
        }
        (None, None) => return Err("either image_size or image_path must be set".into()),
    };

    let classes = load_classes(&config)?;
    if let Some(table) = &classes {
        if table.len() != config.postprocess.num_classes {
            return Err(format!(
                "class names list has {} entries, num_classes is {}",
                table.len(),
                config.postprocess.num_classes
            )
            .into());
        }
    }

    let mut buffers = Vec::with_capacity(config.scales.len());
    let mut anchor_sets = Vec::with_capacity(config.scales.len());
    for (idx, scale) in config.scales.iter().enumerate() {
        buffers.push(read_tensor(&scale.tensor_path)?);
        let anchors = match (&scale.anchors, YOLOV3_ANCHORS.get(idx)) {
            (Some(flat), _) => Anchors::from_flat(flat)?,
            (None, Some(flat)) => Anchors::from_flat(flat)?,
            (None, None) => return Err(format!("scale {idx} needs explicit anchors").into()),
        };
        anchor_sets.push(anchors);
    }

    let num_classes = config.postprocess.num_classes;
    let mut scales = Vec::with_capacity(config.scales.len());
    for ((scale, data), anchors) in config.scales.iter().zip(&buffers).zip(&anchor_sets) {
        let view = NetOutputView::new(
            data,
            scale.grid_h,
            scale.grid_w,
            anchors.len(),
            5 + num_classes,
            num_classes,
        )?;
        scales.push(ScaleOutput::new(view, anchors));
    }

    let post = Postprocessor::new().with_config(PostprocessConfig::from(&config.postprocess));
    let set = post.process(&scales, image.height, image.width)?;
    let detections = set
        .iter()
        .flat_map(|(_, dets)| dets.iter())
        .map(|det| DetectionRecord::new(det, classes.as_ref()))
        .collect();
    let output = Output { image, detections };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
