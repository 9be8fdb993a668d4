//! Benchmarks for scene classification

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use cirrus_algorithms::neural::{Activation, DenseLayer, NetworkModel};
use cirrus_algorithms::pipeline::{ClassifierVariant, PixelClassifier};
use cirrus_algorithms::threshold::ThresholdTable;
use cirrus_algorithms::transform::InputTransform;
use cirrus_core::Raster;
use cirrus_parallel::{CancelToken, ProcessingMode};

const BANDS: usize = 7;
const HIDDEN: usize = 12;

/// 7-12-1 network with fixed, varied weights
fn create_test_model() -> NetworkModel {
    let hidden = Array2::from_shape_fn((HIDDEN, BANDS), |(o, i)| ((o * 7 + i * 3) % 11) as f64 / 5.0 - 1.0);
    let output = Array2::from_shape_fn((1, HIDDEN), |(_, i)| (i % 5) as f64 / 2.0 - 1.0);
    let layers = vec![
        DenseLayer::new(hidden, ndarray::Array1::from_elem(HIDDEN, 0.1)).unwrap(),
        DenseLayer::new(output, ndarray::Array1::from_elem(1, -0.2)).unwrap(),
    ];
    NetworkModel::new(BANDS, layers, Activation::Sigmoid).unwrap()
}

fn create_test_bands(size: usize) -> Vec<Raster<f64>> {
    (0..BANDS)
        .map(|b| {
            let mut r = Raster::new(size, size);
            for row in 0..size {
                for col in 0..size {
                    let v = ((row * 7 + col * 13 + b * 31) % 256) as f64 / 64.0 + 0.01;
                    r.set(row, col, v).unwrap();
                }
            }
            r
        })
        .collect()
}

fn classifier(mode: ProcessingMode) -> PixelClassifier {
    let variant = ClassifierVariant::new(
        "bench",
        ThresholdTable::four_class([0.2, 0.5, 0.8]).unwrap(),
        Arc::new(create_test_model()),
        InputTransform::default(),
        (1..=BANDS).map(|i| format!("band_{}", i)).collect(),
        0,
    )
    .unwrap();
    PixelClassifier::new(variant).with_mode(mode)
}

fn bench_evaluate(c: &mut Criterion) {
    let model = create_test_model();
    let mut ctx = model.context();
    let input = [0.29, 0.15, 0.15, 0.866, 0.866, 0.5, 0.7615];
    c.bench_function("neural/evaluate_7_12_1", |b| {
        b.iter(|| ctx.evaluate(black_box(&input)).unwrap()[0])
    });
}

fn bench_classify_raster(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/classify_raster");
    group.sample_size(10);
    for size in [256, 512, 1024] {
        let bands = create_test_bands(size);
        for (label, mode) in [
            ("sequential", ProcessingMode::Sequential),
            ("parallel", ProcessingMode::Parallel),
        ] {
            let classifier = classifier(mode);
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| {
                    classifier
                        .classify_raster(black_box(&bands), None, &CancelToken::new())
                        .unwrap()
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_classify_raster);
criterion_main!(benches);
