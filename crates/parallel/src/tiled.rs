//! Tiled processing for large scenes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cirrus_core::raster::Extent;

/// A rectangular work unit covering part of a raster.
///
/// Tiles partition the raster: every cell belongs to exactly one tile, so a
/// worker owning a tile may write its cells without synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Position of the tile in iteration order
    pub index: usize,
    /// Cells covered, in raster-local coordinates
    pub extent: Extent,
}

impl Tile {
    /// Number of rows in this tile
    pub fn rows(&self) -> usize {
        self.extent.height
    }

    /// Number of columns in this tile
    pub fn cols(&self) -> usize {
        self.extent.width
    }

    /// Convert tile-local coordinates to source raster coordinates
    pub fn to_source_coords(&self, local_row: usize, local_col: usize) -> (usize, usize) {
        (self.extent.y + local_row, self.extent.x + local_col)
    }
}

/// Iterator over non-overlapping tiles covering a raster, row-major.
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    current_row: usize,
    current_col: usize,
    next_index: usize,
}

impl TileIterator {
    /// Create a new tile iterator. A `tile_size` of zero is treated as one.
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            current_row: 0,
            current_col: 0,
            next_index: 0,
        }
    }

    /// Total number of tiles the iterator yields
    pub fn count_tiles(total_rows: usize, total_cols: usize, tile_size: usize) -> usize {
        let ts = tile_size.max(1);
        if total_rows == 0 || total_cols == 0 {
            return 0;
        }
        total_rows.div_ceil(ts) * total_cols.div_ceil(ts)
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);
        let tile = Tile {
            index: self.next_index,
            extent: Extent::new(self.current_col, self.current_row, cols, rows),
        };
        self.next_index += 1;

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Cooperative cancellation flag shared between a caller and workers.
///
/// Cancelling is sticky. Workers check the token between tiles, so work
/// already started on a tile runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
