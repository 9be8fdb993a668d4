//! # Cirrus Parallel
//!
//! Parallel processing strategies for per-pixel classification.
//!
//! This crate provides:
//! - Tiling of a scene into independent rectangular work units
//! - Sequential or Rayon-backed execution with per-worker state
//! - Cooperative cancellation between tiles

pub mod strategy;
pub mod tiled;

pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
pub use tiled::{CancelToken, Tile, TileIterator};
