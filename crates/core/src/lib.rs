//! # Cirrus Core
//!
//! Core types and traits for the Cirrus pixel classifier.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid bound to a pixel extent
//! - `PixelFlag` / `FlagSet`: the shared classification flag vocabulary
//! - `Error` / `Result`: the error taxonomy used across the workspace
//! - Algorithm traits for consistent API

pub mod error;
pub mod flags;
pub mod raster;

pub use error::{Error, Result};
pub use flags::{FlagSet, PixelFlag};
pub use raster::{Extent, Raster, RasterElement, Window};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::flags::{FlagSet, PixelFlag};
    pub use crate::raster::{Extent, Raster, RasterElement, Window};
    pub use crate::Algorithm;
}

/// A named raster pass with typed parameters.
///
/// Implementors hold no per-run state: everything a run needs arrives in
/// `input` and `params`, and `Params::default()` must be a usable setting.
pub trait Algorithm {
    type Input;
    type Output;
    type Params: Default;
    type Error: std::error::Error;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// One-line summary for listings
    fn description(&self) -> &'static str;

    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// [`Algorithm::execute`] with `Params::default()`
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
