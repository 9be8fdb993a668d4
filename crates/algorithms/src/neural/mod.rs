//! Feed-forward network inference
//!
//! - [`NetworkModel`]: immutable, validated network shared by all workers
//! - [`EvaluationContext`]: per-worker scratch buffers for the forward pass
//! - Model files in JSON or plane text layout (see [`NetworkModel::from_path`])

mod activation;
mod evaluator;
mod format;
mod model;

pub use activation::Activation;
pub use evaluator::EvaluationContext;
pub use model::{DenseLayer, ModelSummary, NetworkModel, Normalization};
