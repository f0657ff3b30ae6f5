use criterion::{criterion_group, criterion_main, Criterion};
use detdecode::lowlevel::decode_candidates;
use detdecode::{
    suppress, AllowList, ByShape, ClassFilter, DetectionPipeline, ImageSize, IouThresholds,
    LabelTable, OutputMap, OwnedTensor, PipelineConfig, RoleResolver,
};
use std::hint::black_box;

/// Candidate count of a 640 px YOLO head (80x80 + 40x40 + 20x20).
const CANDIDATES: usize = 8400;

fn make_outputs(n: usize) -> (OwnedTensor, OwnedTensor, OwnedTensor) {
    let mut boxes = Vec::with_capacity(n * 4);
    let mut scores = Vec::with_capacity(n);
    let mut classes = Vec::with_capacity(n);
    for i in 0..n {
        // Deterministic clusters so suppression has overlaps to resolve.
        let cell = (i / 12) % 400;
        let x = (cell % 20) as f32 * 32.0 + (i % 5) as f32;
        let y = (cell / 20) as f32 * 32.0 + (i % 3) as f32;
        boxes.extend_from_slice(&[x, y, x + 28.0, y + 30.0]);
        scores.push(((i * 37) % 100) as f32 / 100.0);
        classes.push(((i * 7) % 80) as f32);
    }
    (
        OwnedTensor::new(boxes, vec![1, n, 4]).unwrap(),
        OwnedTensor::new(scores, vec![1, n]).unwrap(),
        OwnedTensor::new(classes, vec![1, n]).unwrap(),
    )
}

fn coco_labels() -> LabelTable {
    LabelTable::load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/coco_labels.txt"
    ))
    .unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let (boxes, scores, classes) = make_outputs(CANDIDATES);
    let outputs = OutputMap::new()
        .with("boxes", boxes.view())
        .with("scores", scores.view())
        .with("classes", classes.view());
    let image = ImageSize::new(1920, 1080);

    let pipeline = DetectionPipeline::new(coco_labels(), PipelineConfig::default()).unwrap();
    c.bench_function("detect_8400_default_allow_list", |b| {
        b.iter(|| black_box(pipeline.detect(black_box(&outputs), image)));
    });

    let open = PipelineConfig {
        allow_list: AllowList::Any,
        ..PipelineConfig::default()
    };
    let pipeline_any = DetectionPipeline::new(coco_labels(), open).unwrap();
    c.bench_function("detect_8400_any_label", |b| {
        b.iter(|| black_box(pipeline_any.detect(black_box(&outputs), image)));
    });

    let roles = ByShape.resolve(&outputs).unwrap();
    let candidates = decode_candidates(&roles, &pipeline_any.config().decode, image);
    let detections =
        ClassFilter::new(pipeline_any.labels(), &AllowList::Any).apply(&candidates);
    let thresholds = IouThresholds::default();
    c.bench_function("suppress_only", |b| {
        b.iter(|| black_box(suppress(black_box(detections.clone()), &thresholds)));
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
