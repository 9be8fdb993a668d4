//! Serialized network descriptions
//!
//! Two layouts are understood:
//!
//! - **JSON documents** (`.json`): explicit layers, activation and optional
//!   normalization blocks.
//! - **Plane text** (any other extension): a `#planes=N0 N1 ... Nk` line
//!   followed by whitespace separated numbers in this order: `N0` input
//!   `min max` pairs, `Nk` output `min max` pairs, the biases of planes
//!   `1..=k`, then the weights of each plane transition in row-major
//!   `(output, input)` order. Lines starting with a letter (section markers
//!   such as `bias 1 3` or `wgt 0 7 3`) and `#` comment lines are skipped.
//!   Every plane uses the sigmoid, including the output plane.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use cirrus_core::{Error, Result};

use super::activation::Activation;
use super::model::{DenseLayer, NetworkModel, Normalization};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelDocument {
    inputs: usize,
    #[serde(default)]
    activation: Activation,
    #[serde(default)]
    linear_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_normalization: Option<Normalization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_normalization: Option<Normalization>,
    layers: Vec<LayerDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayerDocument {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

pub(crate) fn load(path: &Path) -> Result<NetworkModel> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::ResourceUnavailable {
            resource: path.display().to_string(),
            reason: "model file not found".to_string(),
        },
        _ => Error::Io(e),
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("json"));

    let model = if is_json {
        parse_json(&text)
    } else {
        parse_planes(&text)
    }?;
    debug!("loaded model {}: {}", path.display(), model.describe());
    Ok(model)
}

pub(crate) fn parse_json(json: &str) -> Result<NetworkModel> {
    let doc: ModelDocument = serde_json::from_str(json)
        .map_err(|e| Error::integrity(format!("invalid model document: {}", e)))?;

    let layers = doc
        .layers
        .into_iter()
        .map(|l| DenseLayer::from_rows(l.weights, l.bias))
        .collect::<Result<Vec<_>>>()?;

    let mut model =
        NetworkModel::new(doc.inputs, layers, doc.activation)?.with_linear_output(doc.linear_output);
    if let Some(norm) = doc.input_normalization {
        model = model.with_input_normalization(norm)?;
    }
    if let Some(norm) = doc.output_normalization {
        model = model.with_output_normalization(norm)?;
    }
    Ok(model)
}

pub(crate) fn to_json(model: &NetworkModel) -> Result<String> {
    let doc = ModelDocument {
        inputs: model.inputs(),
        activation: model.activation(),
        linear_output: model.linear_output(),
        input_normalization: model.input_normalization().cloned(),
        output_normalization: model.output_normalization().cloned(),
        layers: model
            .layers()
            .iter()
            .map(|l| LayerDocument {
                weights: l.weights().rows().into_iter().map(|r| r.to_vec()).collect(),
                bias: l.bias().to_vec(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub(crate) fn parse_planes(text: &str) -> Result<NetworkModel> {
    let mut lines = text.lines().enumerate();

    let widths = loop {
        let Some((_, line)) = lines.next() else {
            return Err(Error::integrity("missing '#planes=' declaration"));
        };
        if let Some(rest) = line.trim().strip_prefix("#planes=") {
            break parse_widths(rest)?;
        }
    };

    let mut numbers = Vec::new();
    for (n, line) in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(|c: char| c.is_ascii_alphabetic()) {
            continue;
        }
        for token in line.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| {
                Error::integrity(format!("line {}: '{}' is not a number", n + 1, token))
            })?;
            numbers.push(v);
        }
    }

    let n_in = widths[0];
    let n_out = widths[widths.len() - 1];
    let expected = coefficient_count(&widths)
        .ok_or_else(|| Error::integrity(format!("plane widths overflow: {:?}", widths)))?;
    if numbers.len() != expected {
        return Err(Error::integrity(format!(
            "plane network {:?} needs {} coefficients, found {}",
            widths,
            expected,
            numbers.len()
        )));
    }

    let mut cursor = numbers.into_iter();
    let mut take = |n: usize| -> Vec<f64> { cursor.by_ref().take(n).collect() };

    let in_ranges = pairs(&take(2 * n_in));
    let out_ranges = pairs(&take(2 * n_out));
    let biases: Vec<Vec<f64>> = widths[1..].iter().map(|&w| take(w)).collect();
    let mut layers = Vec::with_capacity(widths.len() - 1);
    for (w, bias) in widths.windows(2).zip(biases) {
        let (inputs, outputs) = (w[0], w[1]);
        let rows: Vec<Vec<f64>> = (0..outputs).map(|_| take(inputs)).collect();
        layers.push(DenseLayer::from_rows(rows, bias)?);
    }

    NetworkModel::new(n_in, layers, Activation::Sigmoid)?
        .with_input_normalization(Normalization::from_ranges(&in_ranges)?)?
        .with_output_normalization(Normalization::from_ranges(&out_ranges)?)
}

fn parse_widths(line: &str) -> Result<Vec<usize>> {
    let widths = line
        .split_whitespace()
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| Error::integrity(format!("invalid plane width '{}'", t)))
        })
        .collect::<Result<Vec<_>>>()?;
    if widths.len() < 2 {
        return Err(Error::integrity(format!(
            "a network needs at least 2 planes, declared {}",
            widths.len()
        )));
    }
    if widths.contains(&0) {
        return Err(Error::integrity(format!("plane widths must be positive: {:?}", widths)));
    }
    Ok(widths)
}

/// Ranges, biases and weights declared by a plane layout; `None` on overflow
fn coefficient_count(widths: &[usize]) -> Option<usize> {
    let n_in = widths[0];
    let n_out = widths[widths.len() - 1];
    let ranges = n_in.checked_add(n_out)?.checked_mul(2)?;
    let biases = widths[1..].iter().try_fold(0_usize, |acc, &w| acc.checked_add(w))?;
    let weights = widths
        .windows(2)
        .try_fold(0_usize, |acc, w| acc.checked_add(w[0].checked_mul(w[1])?))?;
    ranges.checked_add(biases)?.checked_add(weights)
}

fn pairs(flat: &[f64]) -> Vec<(f64, f64)> {
    flat.chunks_exact(2).map(|p| (p[0], p[1])).collect()
}
