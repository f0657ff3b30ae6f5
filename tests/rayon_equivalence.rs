#![cfg(feature = "rayon")]

use detdecode::{DetectionPipeline, ImageSize, LabelTable, OutputMap, OwnedTensor, PipelineConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Frame {
    boxes: OwnedTensor,
    scores: OwnedTensor,
    classes: OwnedTensor,
}

fn make_frame(rng: &mut StdRng, n: usize) -> Frame {
    let mut boxes = Vec::with_capacity(n * 4);
    let mut scores = Vec::with_capacity(n);
    let mut classes = Vec::with_capacity(n);
    for _ in 0..n {
        let x: f32 = rng.random_range(0.0..560.0);
        let y: f32 = rng.random_range(0.0..560.0);
        let w: f32 = rng.random_range(8.0..80.0);
        let h: f32 = rng.random_range(8.0..80.0);
        boxes.extend_from_slice(&[x, y, x + w, y + h]);
        scores.push(rng.random_range(0.0f32..1.0));
        classes.push(rng.random_range(0..4u32) as f32);
    }
    Frame {
        boxes: OwnedTensor::new(boxes, vec![1, n, 4]).unwrap(),
        scores: OwnedTensor::new(scores, vec![1, n]).unwrap(),
        classes: OwnedTensor::new(classes, vec![1, n]).unwrap(),
    }
}

#[test]
fn parallel_batch_matches_sequential() {
    let labels = LabelTable::from_text("person\ncar\ncup\napple").unwrap();
    let pipeline = DetectionPipeline::new(labels, PipelineConfig::default()).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let frames: Vec<Frame> = (0..16).map(|_| make_frame(&mut rng, 300)).collect();
    let inputs: Vec<(OutputMap<'_>, ImageSize)> = frames
        .iter()
        .map(|f| {
            let outputs = OutputMap::new()
                .with("boxes", f.boxes.view())
                .with("scores", f.scores.view())
                .with("classes", f.classes.view());
            (outputs, ImageSize::new(1280, 720))
        })
        .collect();

    let sequential = pipeline.detect_batch(&inputs);
    let parallel = pipeline.detect_batch_par(&inputs);
    assert_eq!(sequential, parallel);
    assert!(sequential.iter().any(|dets| !dets.is_empty()));
}
