//! Integration tests replaying recorded output fixtures.
//!
//! Each case in `tests/fixtures/frames.json` carries raw model outputs, the
//! original image size and the detections the pipeline must produce.

use detdecode::{
    BoxCoordinates, DecodeConfig, DetectionPipeline, ImageSize, LabelTable, OutputMap,
    OwnedTensor, PipelineConfig,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Coordinate tolerance in pixels.
const RECT_TOLERANCE_PX: f32 = 1e-2;

#[derive(Debug, Deserialize)]
struct Fixture {
    cases: Vec<Case>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Coordinates {
    #[default]
    Pixels,
    Normalized,
}

#[derive(Debug, Deserialize)]
struct Output {
    name: String,
    shape: Vec<usize>,
    data: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct Expected {
    label: String,
    confidence: f32,
    rect: [f32; 4],
}

#[derive(Debug, Deserialize)]
struct Case {
    case_id: String,
    image: [u32; 2],
    #[serde(default)]
    coordinates: Coordinates,
    /// Inline label table; the COCO fixture when absent.
    #[serde(default)]
    labels: Option<Vec<String>>,
    outputs: Vec<Output>,
    expected: Vec<Expected>,
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture() -> Fixture {
    let text = fs::read_to_string(fixtures_dir().join("frames.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn labels_for(case: &Case) -> LabelTable {
    match &case.labels {
        Some(labels) => LabelTable::new(labels.clone()).unwrap(),
        None => LabelTable::load(fixtures_dir().join("coco_labels.txt")).unwrap(),
    }
}

#[test]
fn recorded_frames_decode_to_expected_detections() {
    let fixture = load_fixture();
    assert!(!fixture.cases.is_empty());

    for case in &fixture.cases {
        let tensors: Vec<(String, OwnedTensor)> = case
            .outputs
            .iter()
            .map(|o| {
                let tensor = OwnedTensor::new(o.data.clone(), o.shape.clone()).unwrap();
                (o.name.clone(), tensor)
            })
            .collect();
        let outputs: OutputMap<'_> = tensors
            .iter()
            .map(|(name, tensor)| (name.clone(), tensor.view()))
            .collect();

        let coordinates = match case.coordinates {
            Coordinates::Pixels => BoxCoordinates::ModelPixels,
            Coordinates::Normalized => BoxCoordinates::Normalized,
        };
        let cfg = PipelineConfig {
            decode: DecodeConfig {
                coordinates,
                ..DecodeConfig::default()
            },
            ..PipelineConfig::default()
        };
        let pipeline = DetectionPipeline::new(labels_for(case), cfg).unwrap();
        let dets = pipeline.detect(&outputs, ImageSize::new(case.image[0], case.image[1]));

        assert_eq!(
            dets.len(),
            case.expected.len(),
            "{}: got {dets:?}",
            case.case_id
        );
        for (det, want) in dets.iter().zip(&case.expected) {
            assert_eq!(det.label, want.label, "{}", case.case_id);
            assert!(
                (det.confidence - want.confidence).abs() < 1e-6,
                "{}: confidence {} != {}",
                case.case_id,
                det.confidence,
                want.confidence
            );
            for (got, exp) in det.rect().iter().zip(want.rect) {
                assert!(
                    (got - exp).abs() < RECT_TOLERANCE_PX,
                    "{}: rect {:?} != {:?}",
                    case.case_id,
                    det.rect(),
                    want.rect
                );
            }
        }
    }
}
