use clap::Parser;
use detdecode::{
    AllowList, BoxCoordinates, ByName, ClampPolicy, DecodeConfig, Detection, DetectionPipeline,
    ImageSize, IouThresholds, LabelTable, OutputMap, OwnedTensor, PipelineConfig, PipelineEvent,
    RoleStrategy,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "detdecode CLI (JSON config driven)")]
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
    /// Enable tracing output, including per-candidate pipeline events.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CoordinatesConfig {
    #[default]
    ModelPixels,
    Normalized,
}

impl From<CoordinatesConfig> for BoxCoordinates {
    fn from(value: CoordinatesConfig) -> Self {
        match value {
            CoordinatesConfig::ModelPixels => BoxCoordinates::ModelPixels,
            CoordinatesConfig::Normalized => BoxCoordinates::Normalized,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ClampConfig {
    #[default]
    ImageBounds,
    OriginOnly,
}

impl From<ClampConfig> for ClampPolicy {
    fn from(value: ClampConfig) -> Self {
        match value {
            ClampConfig::ImageBounds => ClampPolicy::ImageBounds,
            ClampConfig::OriginOnly => ClampPolicy::OriginOnly,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OutputNames {
    boxes: String,
    scores: String,
    #[serde(default)]
    classes: Option<String>,
}

impl From<OutputNames> for ByName {
    fn from(value: OutputNames) -> Self {
        ByName::new(value.boxes, value.scores, value.classes)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", tag = "strategy")]
enum RolesConfig {
    #[default]
    Shape,
    Position,
    Name(OutputNames),
    NameThenShape(OutputNames),
}

impl From<RolesConfig> for RoleStrategy {
    fn from(value: RolesConfig) -> Self {
        match value {
            RolesConfig::Shape => RoleStrategy::Shape,
            RolesConfig::Position => RoleStrategy::Position,
            RolesConfig::Name(names) => RoleStrategy::Name(names.into()),
            RolesConfig::NameThenShape(names) => RoleStrategy::NameThenShape(names.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PipelineConfigJson {
    confidence_threshold: f32,
    input_tile_size: f32,
    coordinates: CoordinatesConfig,
    clamp: ClampConfig,
    /// `null` retains every label in the table.
    allow_list: Option<Vec<String>>,
    default_iou: f32,
    iou_overrides: BTreeMap<String, f32>,
    roles: RolesConfig,
}

impl Default for PipelineConfigJson {
    fn default() -> Self {
        let decode = DecodeConfig::default();
        let nms = IouThresholds::default();
        let allow_list = match AllowList::default() {
            AllowList::Any => None,
            AllowList::Only(labels) => Some(labels.into_iter().collect()),
        };
        Self {
            confidence_threshold: decode.confidence_threshold,
            input_tile_size: decode.input_tile_size,
            coordinates: CoordinatesConfig::default(),
            clamp: ClampConfig::default(),
            allow_list,
            default_iou: nms.default_iou,
            iou_overrides: nms.overrides,
            roles: RolesConfig::default(),
        }
    }
}

impl From<PipelineConfigJson> for PipelineConfig {
    fn from(value: PipelineConfigJson) -> Self {
        Self {
            decode: DecodeConfig {
                confidence_threshold: value.confidence_threshold,
                input_tile_size: value.input_tile_size,
                coordinates: value.coordinates.into(),
                clamp: value.clamp.into(),
            },
            allow_list: value.allow_list.map_or(AllowList::Any, AllowList::only),
            nms: IouThresholds {
                default_iou: value.default_iou,
                overrides: value.iou_overrides,
            },
            roles: value.roles.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    labels_path: String,
    outputs_path: String,
    output_path: Option<String>,
    image_width: u32,
    image_height: u32,
    pipeline: PipelineConfigJson,
}

/// Raw model outputs captured from an inference engine.
#[derive(Debug, Deserialize)]
struct OutputsFile {
    outputs: Vec<TensorJson>,
}

#[derive(Debug, Deserialize)]
struct TensorJson {
    name: String,
    shape: Vec<usize>,
    data: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    label: String,
    confidence: f32,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl From<Detection> for DetectionRecord {
    fn from(value: Detection) -> Self {
        Self {
            label: value.label,
            confidence: value.confidence,
            left: value.left,
            top: value.top,
            right: value.right,
            bottom: value.bottom,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    image_width: u32,
    image_height: u32,
    detections: Vec<DetectionRecord>,
}

fn log_event(event: &PipelineEvent<'_>) {
    match event {
        PipelineEvent::RolesUnresolved { reason } => {
            tracing::warn!(reason = *reason, "output roles unresolved")
        }
        PipelineEvent::CandidateRejected { index, reason } => {
            tracing::debug!(index = *index, reason = ?reason, "candidate rejected")
        }
        PipelineEvent::CandidateAccepted {
            index,
            label,
            confidence,
        } => tracing::debug!(
            index = *index,
            label = *label,
            confidence = *confidence,
            "candidate accepted"
        ),
        other => tracing::info!(event = ?other, "pipeline"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive("detdecode=info".parse()?)
                    .add_directive("detdecode_cli=debug".parse()?),
            )
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
    if config.labels_path.is_empty() || config.outputs_path.is_empty() {
        return Err("labels_path and outputs_path must be set in the config".into());
    }
    if config.image_width == 0 || config.image_height == 0 {
        return Err("image_width and image_height must be at least 1".into());
    }

    let labels = LabelTable::load(&config.labels_path)?;
    let mut pipeline = DetectionPipeline::new(labels, config.pipeline.into())?;
    if cli.trace {
        pipeline = pipeline.with_observer(Arc::new(log_event));
    }

    let outputs_text = fs::read_to_string(&config.outputs_path)?;
    let outputs_file: OutputsFile = serde_json::from_str(&outputs_text)?;
    let tensors = outputs_file
        .outputs
        .into_iter()
        .map(|t| Ok((t.name, OwnedTensor::new(t.data, t.shape)?)))
        .collect::<Result<Vec<_>, detdecode::DetDecodeError>>()?;
    let outputs: OutputMap<'_> = tensors
        .iter()
        .map(|(name, tensor)| (name.clone(), tensor.view()))
        .collect();

    let image = ImageSize::new(config.image_width, config.image_height);
    let detections = pipeline.try_detect(&outputs, image)?;
    let output = Output {
        image_width: image.width,
        image_height: image.height,
        detections: detections.into_iter().map(DetectionRecord::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
