//! Error types for Cirrus

use thiserror::Error;

/// Main error type for Cirrus operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed or dimensionally inconsistent network description.
    #[error("Model integrity error: {reason}")]
    ModelIntegrity { reason: String },

    /// A vector of the wrong length reached a fixed-width stage.
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A raw sample outside the input transform's domain.
    #[error("Invalid sample in band {band}: {value} ({reason})")]
    InvalidSample {
        band: usize,
        value: f64,
        reason: &'static str,
    },

    /// A model artifact, threshold table or configuration could not be located.
    #[error("Resource unavailable: {resource} ({reason})")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::ModelIntegrity`] with a formatted reason.
    pub fn integrity(reason: impl Into<String>) -> Self {
        Error::ModelIntegrity {
            reason: reason.into(),
        }
    }

    /// Whether the error is a per-pixel data error that callers recover locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::InvalidSample { .. })
    }
}

/// Result type alias for Cirrus operations
pub type Result<T> = std::result::Result<T, Error>;
