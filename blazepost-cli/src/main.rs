use blazepost::lowlevel::{f32s_from_le_bytes, load_anchors};
use blazepost::{
    generate_anchors, Detection, Detections, Detector, DetectorConfig, ModelVariant, TensorView,
    NUM_ANCHORS,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "BlazeFace post-processing CLI (JSON config driven)")]
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
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum VariantConfig {
    #[default]
    Front,
    Back,
}

impl From<VariantConfig> for ModelVariant {
    fn from(value: VariantConfig) -> Self {
        match value {
            VariantConfig::Front => ModelVariant::Front,
            VariantConfig::Back => ModelVariant::Back,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    variant: VariantConfig,
    anchors_path: Option<String>,
    raw_boxes_path: String,
    raw_scores_path: String,
    min_score_thresh: Option<f32>,
    min_suppression_threshold: Option<f32>,
    parallel: bool,
    output_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variant: VariantConfig::Front,
            anchors_path: None,
            raw_boxes_path: String::new(),
            raw_scores_path: String::new(),
            min_score_thresh: None,
            min_suppression_threshold: None,
            parallel: false,
            output_path: None,
        }
    }
}

impl Config {
    fn detector_config(&self, variant: ModelVariant) -> DetectorConfig {
        let mut cfg = DetectorConfig::for_variant(variant).with_parallel(self.parallel);
        if let Some(thresh) = self.min_score_thresh {
            cfg.min_score_thresh = thresh;
        }
        if let Some(thresh) = self.min_suppression_threshold {
            cfg.min_suppression_threshold = thresh;
        }
        cfg
    }
}

#[derive(Debug, Serialize)]
struct BoxRecord {
    ymin: f32,
    xmin: f32,
    ymax: f32,
    xmax: f32,
}

#[derive(Debug, Serialize)]
struct FaceRecord {
    bbox: BoxRecord,
    keypoints: Vec<[f32; 2]>,
    score: f32,
}

impl From<&Detection> for FaceRecord {
    fn from(value: &Detection) -> Self {
        Self {
            bbox: BoxRecord {
                ymin: value.ymin(),
                xmin: value.xmin(),
                ymax: value.ymax(),
                xmax: value.xmax(),
            },
            keypoints: value.keypoints().iter().map(|&(x, y)| [x, y]).collect(),
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRecord {
    index: usize,
    faces: Vec<FaceRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    variant: &'static str,
    images: Vec<ImageRecord>,
}

fn read_f32_file(path: &Path) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let bytes = fs::read(path).map_err(|err| format!("{}: {err}", path.display()))?;
    let values =
        f32s_from_le_bytes(&bytes).map_err(|err| format!("{}: {err}", path.display()))?;
    Ok(values)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("blazepost=info".parse()?))
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
    if config.raw_boxes_path.is_empty() || config.raw_scores_path.is_empty() {
        return Err("raw_boxes_path and raw_scores_path must be set in the config".into());
    }

    let variant = ModelVariant::from(config.variant);
    let detector_cfg = config.detector_config(variant);

    let anchors = match &config.anchors_path {
        Some(path) => load_anchors(path, NUM_ANCHORS)?,
        None => generate_anchors(variant)?,
    };
    let detector = Detector::new(detector_cfg, anchors)?;

    let boxes = read_f32_file(Path::new(&config.raw_boxes_path))?;
    let scores = read_f32_file(Path::new(&config.raw_scores_path))?;
    let boxes = TensorView::with_inferred_batch(&boxes, NUM_ANCHORS, 16)?;
    let scores = TensorView::new(&scores, boxes.batch(), NUM_ANCHORS, 1)?;

    let results: Vec<Detections> = detector.postprocess(boxes, scores)?;
    let total: usize = results.iter().map(Detections::len).sum();
    tracing::info!(images = results.len(), faces = total, "post-processing done");
    let images = results
        .iter()
        .enumerate()
        .map(|(index, faces)| ImageRecord {
            index,
            faces: faces.iter().map(FaceRecord::from).collect(),
        })
        .collect();
    let output = Output {
        variant: variant.name(),
        images,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
