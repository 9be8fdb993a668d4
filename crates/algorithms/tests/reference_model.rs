//! Reference network fixtures.
//!
//! `tests/fixtures/reference_7_4_1.net` is a 7-4-1 cloud-probability network
//! in plane text layout; `reference_7_4_1.json` holds the same weights as a
//! JSON document.

use std::path::PathBuf;

use cirrus_algorithms::neural::{Activation, NetworkModel};
use cirrus_core::Error;

const REFERENCE_INPUT: [f64; 7] = [0.29, 0.15, 0.15, 0.866, 0.866, 0.5, 761.5];
const REFERENCE_OUTPUT: f64 = 990.939;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn plane_model_reproduces_reference_output() {
    let model = NetworkModel::from_path(fixture("reference_7_4_1.net")).unwrap();
    let out = model.evaluate(&REFERENCE_INPUT).unwrap();
    assert_eq!(out.len(), 1);
    assert!(
        (out[0] - REFERENCE_OUTPUT).abs() < 1e-3,
        "got {}, expected {}",
        out[0],
        REFERENCE_OUTPUT
    );
}

#[test]
fn plane_model_topology() {
    let model = NetworkModel::from_path(fixture("reference_7_4_1.net")).unwrap();
    let summary = model.describe();
    assert_eq!(summary.widths, vec![7, 4, 1]);
    assert_eq!(model.activation(), Activation::Sigmoid);
    assert_eq!(model.parameter_count(), 7 * 4 + 4 + 4 + 1);
    assert!(model.input_normalization().is_some());
    assert!(model.output_normalization().is_some());
}

#[test]
fn json_and_plane_formats_agree() {
    let planes = NetworkModel::from_path(fixture("reference_7_4_1.net")).unwrap();
    let json = NetworkModel::from_path(fixture("reference_7_4_1.json")).unwrap();
    assert_eq!(planes.describe(), json.describe());

    let inputs = [
        REFERENCE_INPUT,
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 500.0],
        [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1100.0],
        [0.05, 0.9, 0.4, 0.12, 0.66, 0.31, 1013.25],
    ];
    for input in inputs {
        let a = planes.evaluate(&input).unwrap()[0];
        let b = json.evaluate(&input).unwrap()[0];
        assert!((a - b).abs() < 1e-9, "{:?}: {} vs {}", input, a, b);
    }
}

#[test]
fn output_stays_in_declared_range() {
    let model = NetworkModel::from_path(fixture("reference_7_4_1.net")).unwrap();
    let mut ctx = model.context();
    for i in 0..50 {
        let t = i as f64 / 49.0;
        let input = [t, 1.0 - t, t * t, 0.5, t, 0.25, 500.0 + 600.0 * t];
        let out = ctx.evaluate(&input).unwrap()[0];
        assert!((900.0..=1100.0).contains(&out), "{} out of range", out);
    }
}

#[test]
fn exported_json_reloads() {
    let model = NetworkModel::from_path(fixture("reference_7_4_1.net")).unwrap();
    let json = model.to_json_string().unwrap();
    let back = NetworkModel::from_json_str(&json).unwrap();
    let a = model.evaluate(&REFERENCE_INPUT).unwrap()[0];
    let b = back.evaluate(&REFERENCE_INPUT).unwrap()[0];
    assert!((a - b).abs() < 1e-9);
}

#[test]
fn wrong_input_width_is_rejected() {
    let model = NetworkModel::from_path(fixture("reference_7_4_1.net")).unwrap();
    let err = model.evaluate(&REFERENCE_INPUT[..6]).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { expected: 7, actual: 6, .. }));
}

#[test]
fn truncated_model_is_an_integrity_error() {
    let text = std::fs::read_to_string(fixture("reference_7_4_1.net")).unwrap();
    let truncated: String = text.lines().take(20).collect::<Vec<_>>().join("\n");
    let err = NetworkModel::from_planes_str(&truncated).unwrap_err();
    assert!(matches!(err, Error::ModelIntegrity { .. }), "got {:?}", err);
}
