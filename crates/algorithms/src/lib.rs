//! # Cirrus Algorithms
//!
//! Cloud classification algorithms for Cirrus.
//!
//! ## Modules
//!
//! - **neural**: Feed-forward network models, model files, per-worker evaluation
//! - **transform**: Raw band samples to network inputs
//! - **threshold**: Score to flag tables, including the named variants
//! - **buffer**: Square cloud buffer around triggering flags
//! - **pipeline**: Tiled two-pass scene classification and its configuration

pub(crate) mod maybe_rayon;

pub mod buffer;
pub mod neural;
pub mod pipeline;
pub mod threshold;
pub mod transform;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::{buffer_around, cloud_buffer, CloudBuffer, CloudBufferParams};
    pub use crate::neural::{Activation, DenseLayer, EvaluationContext, NetworkModel, Normalization};
    pub use crate::pipeline::{
        ClassificationOutput, ClassificationSummary, ClassifierVariant, PipelineConfig,
        PixelClassifier, PixelOutcome, TableSource,
    };
    pub use crate::threshold::{table_names, ThresholdTable};
    pub use crate::transform::{BandTransform, InputTransform};
    pub use cirrus_core::prelude::*;
    pub use cirrus_parallel::{CancelToken, ProcessingMode};
}
