//! Immutable feed-forward network description

use std::fmt;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use cirrus_core::{Error, Result};

use super::activation::Activation;
use super::evaluator::EvaluationContext;
use super::format;

/// Per-element linear normalization `x' = (x - offset) * scale`.
///
/// On the input side the forward mapping is applied before the first layer.
/// On the output side the inverse `x = x' / scale + offset` is applied after
/// the last layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub offset: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Normalization {
    pub fn new(offset: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { offset, scale }
    }

    /// Map each `(min, max)` range onto `[0, 1]`.
    pub fn from_ranges(ranges: &[(f64, f64)]) -> Result<Self> {
        let mut offset = Vec::with_capacity(ranges.len());
        let mut scale = Vec::with_capacity(ranges.len());
        for (i, &(min, max)) in ranges.iter().enumerate() {
            let width = max - min;
            if !width.is_finite() || width == 0.0 {
                return Err(Error::integrity(format!(
                    "range {} is degenerate: [{}, {}]",
                    i, min, max
                )));
            }
            offset.push(min);
            scale.push(1.0 / width);
        }
        Ok(Self { offset, scale })
    }

    pub fn len(&self) -> usize {
        self.offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offset.is_empty()
    }

    #[inline]
    pub fn normalize(&self, i: usize, x: f64) -> f64 {
        (x - self.offset[i]) * self.scale[i]
    }

    #[inline]
    pub fn denormalize(&self, i: usize, x: f64) -> f64 {
        x / self.scale[i] + self.offset[i]
    }

    fn validate(&self, expected: usize, side: &str) -> Result<()> {
        if self.offset.len() != expected || self.scale.len() != expected {
            return Err(Error::integrity(format!(
                "{} normalization has {} offsets and {} scales, network width is {}",
                side,
                self.offset.len(),
                self.scale.len(),
                expected
            )));
        }
        if self.offset.iter().any(|v| !v.is_finite()) {
            return Err(Error::integrity(format!("{} normalization offset is not finite", side)));
        }
        if self.scale.iter().any(|v| !v.is_finite() || *v == 0.0) {
            return Err(Error::integrity(format!(
                "{} normalization scale must be finite and non-zero",
                side
            )));
        }
        Ok(())
    }
}

/// One fully connected layer: `outputs × inputs` weights plus a bias per output.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl DenseLayer {
    pub fn new(weights: Array2<f64>, bias: Array1<f64>) -> Result<Self> {
        if weights.nrows() != bias.len() {
            return Err(Error::integrity(format!(
                "layer has {} weight rows but {} biases",
                weights.nrows(),
                bias.len()
            )));
        }
        if weights.ncols() == 0 || weights.nrows() == 0 {
            return Err(Error::integrity(format!(
                "layer has empty weight matrix {}x{}",
                weights.nrows(),
                weights.ncols()
            )));
        }
        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err(Error::integrity("layer has non-finite coefficients"));
        }
        Ok(Self { weights, bias })
    }

    /// Build from nested rows, as found in serialized model documents.
    pub fn from_rows(rows: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self> {
        let n_out = rows.len();
        let n_in = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_in) {
            return Err(Error::integrity(format!(
                "weight row {} has {} entries, expected {}",
                i,
                row.len(),
                n_in
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((n_out, n_in), flat)
            .map_err(|e| Error::integrity(e.to_string()))?;
        Self::new(weights, Array1::from(bias))
    }

    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array1<f64> {
        &self.bias
    }

    /// `out = W · input + b`, before activation
    #[inline]
    pub(crate) fn affine_into(&self, input: &[f64], out: &mut [f64]) {
        for ((o, row), b) in out.iter_mut().zip(self.weights.rows()).zip(self.bias.iter()) {
            let mut sum = *b;
            for (w, x) in row.iter().zip(input) {
                sum += w * x;
            }
            *o = sum;
        }
    }
}

/// A parsed, validated feed-forward network.
///
/// The model is immutable once built and holds no scratch state, so one
/// instance (usually behind an `Arc`) serves every worker. Each worker
/// evaluates it through its own [`EvaluationContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkModel {
    inputs: usize,
    layers: Vec<DenseLayer>,
    activation: Activation,
    linear_output: bool,
    input_norm: Option<Normalization>,
    output_norm: Option<Normalization>,
}

impl NetworkModel {
    /// Build a model, checking that consecutive layer widths chain.
    pub fn new(inputs: usize, layers: Vec<DenseLayer>, activation: Activation) -> Result<Self> {
        if inputs == 0 {
            return Err(Error::integrity("network declares zero inputs"));
        }
        if layers.is_empty() {
            return Err(Error::integrity("network has no layers"));
        }
        let mut width = inputs;
        for (i, layer) in layers.iter().enumerate() {
            if layer.inputs() != width {
                return Err(Error::integrity(format!(
                    "layer {} expects {} inputs but receives {}",
                    i,
                    layer.inputs(),
                    width
                )));
            }
            width = layer.outputs();
        }
        Ok(Self {
            inputs,
            layers,
            activation,
            linear_output: false,
            input_norm: None,
            output_norm: None,
        })
    }

    /// Skip the activation on the final layer.
    pub fn with_linear_output(mut self, linear: bool) -> Self {
        self.linear_output = linear;
        self
    }

    pub fn with_input_normalization(mut self, norm: Normalization) -> Result<Self> {
        norm.validate(self.inputs, "input")?;
        self.input_norm = Some(norm);
        Ok(self)
    }

    pub fn with_output_normalization(mut self, norm: Normalization) -> Result<Self> {
        norm.validate(self.outputs(), "output")?;
        self.output_norm = Some(norm);
        Ok(self)
    }

    /// Load a model file, picking the format from the extension.
    ///
    /// `.json` files are model documents; anything else is read as the
    /// plane text format. A missing file is [`Error::ResourceUnavailable`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        format::load(path.as_ref())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        format::parse_json(json)
    }

    pub fn from_planes_str(text: &str) -> Result<Self> {
        format::parse_planes(text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        format::to_json(self)
    }

    /// Declared input vector width
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Output vector width
    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::outputs)
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn linear_output(&self) -> bool {
        self.linear_output
    }

    pub fn input_normalization(&self) -> Option<&Normalization> {
        self.input_norm.as_ref()
    }

    pub fn output_normalization(&self) -> Option<&Normalization> {
        self.output_norm.as_ref()
    }

    /// Widest vector seen during a forward pass
    pub fn max_width(&self) -> usize {
        self.layers
            .iter()
            .map(DenseLayer::outputs)
            .fold(self.inputs, usize::max)
    }

    /// Number of weights and biases
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }

    /// Fresh scratch space for evaluating this model
    pub fn context(&self) -> EvaluationContext<'_> {
        EvaluationContext::new(self)
    }

    /// One-off evaluation. Hot loops should reuse an [`EvaluationContext`].
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut ctx = self.context();
        let output = ctx.evaluate(input)?.to_vec();
        Ok(output)
    }

    pub fn describe(&self) -> ModelSummary {
        let mut widths = Vec::with_capacity(self.layers.len() + 1);
        widths.push(self.inputs);
        widths.extend(self.layers.iter().map(DenseLayer::outputs));
        ModelSummary {
            widths,
            activation: self.activation,
            linear_output: self.linear_output,
            parameters: self.parameter_count(),
            input_normalized: self.input_norm.is_some(),
            output_normalized: self.output_norm.is_some(),
        }
    }
}

/// Topology overview used for logs and the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub widths: Vec<usize>,
    pub activation: Activation,
    pub linear_output: bool,
    pub parameters: usize,
    pub input_normalized: bool,
    pub output_normalized: bool,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<String> = self.widths.iter().map(usize::to_string).collect();
        write!(
            f,
            "{} [{}{}], {} parameters",
            widths.join("-"),
            self.activation.name(),
            if self.linear_output { ", linear output" } else { "" },
            self.parameters
        )?;
        if self.input_normalized || self.output_normalized {
            write!(
                f,
                ", normalized {}",
                match (self.input_normalized, self.output_normalized) {
                    (true, true) => "input/output",
                    (true, false) => "input",
                    _ => "output",
                }
            )?;
        }
        Ok(())
    }
}
