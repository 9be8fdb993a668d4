//! Raster classification pipeline
//!
//! Two passes over a scene:
//!
//! 1. Tiles are classified independently (transform, network, threshold),
//!    each worker reusing one [`EvaluationContext`].
//! 2. Once every tile is merged, the cloud buffer pass reads the complete
//!    flag raster and produces the buffer band.

mod config;
mod variant;

pub use config::{BufferConfig, PipelineConfig, TableSource};
pub use variant::{ClassifierVariant, PixelOutcome};

use std::fmt;

use ndarray::Array2;
use tracing::{debug, info, warn};
use cirrus_core::raster::Raster;
use cirrus_core::{Error, PixelFlag, Result};
use cirrus_parallel::{CancelToken, ParallelStrategy, ProcessingMode, Tile, TileIterator};

use crate::buffer::{cloud_buffer, CloudBufferParams};
use crate::neural::EvaluationContext;

/// Default tile edge length in pixels
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Per-scene classifier built from a [`ClassifierVariant`].
#[derive(Debug, Clone)]
pub struct PixelClassifier {
    variant: ClassifierVariant,
    buffer: Option<CloudBufferParams>,
    tile_size: usize,
    mode: ProcessingMode,
    emit_scores: bool,
}

/// Bands produced by [`PixelClassifier::classify_raster`]
#[derive(Debug, Clone)]
pub struct ClassificationOutput {
    /// One flag bit per pixel; untouched pixels are `Unprocessed`
    pub flags: Raster<u16>,
    /// Network scores, NaN where no inference was made
    pub scores: Option<Raster<f32>>,
    /// Buffer mask, when the buffer pass is enabled and the run completed
    pub buffer: Option<Raster<u16>>,
    pub summary: ClassificationSummary,
    /// Whether the run stopped before every tile was classified
    pub cancelled: bool,
}

/// Pixel counts of a classified scene
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub pixels: usize,
    pub clear: usize,
    pub ambiguous: usize,
    pub non_cloud: usize,
    pub cloud: usize,
    pub unprocessed: usize,
    pub buffered: usize,
    pub tiles_done: usize,
    pub tiles_total: usize,
}

impl ClassificationSummary {
    fn tally(flags: &Raster<u16>, buffer: Option<&Raster<u16>>, tiles_done: usize, tiles_total: usize) -> Self {
        let mut summary = Self {
            pixels: flags.len(),
            tiles_done,
            tiles_total,
            ..Default::default()
        };
        for &cell in flags.data() {
            for flag in PixelFlag::ALL {
                if cell & flag.bits() != 0 {
                    *summary.slot(flag) += 1;
                }
            }
        }
        if let Some(buffer) = buffer {
            summary.buffered = buffer.data().iter().filter(|&&v| v != 0).count();
        }
        summary
    }

    fn slot(&mut self, flag: PixelFlag) -> &mut usize {
        match flag {
            PixelFlag::Clear => &mut self.clear,
            PixelFlag::Ambiguous => &mut self.ambiguous,
            PixelFlag::NonCloud => &mut self.non_cloud,
            PixelFlag::Cloud => &mut self.cloud,
            PixelFlag::Unprocessed => &mut self.unprocessed,
            PixelFlag::Buffer => &mut self.buffered,
        }
    }

    /// Number of pixels carrying `flag`
    pub fn count(&self, flag: PixelFlag) -> usize {
        match flag {
            PixelFlag::Clear => self.clear,
            PixelFlag::Ambiguous => self.ambiguous,
            PixelFlag::NonCloud => self.non_cloud,
            PixelFlag::Cloud => self.cloud,
            PixelFlag::Unprocessed => self.unprocessed,
            PixelFlag::Buffer => self.buffered,
        }
    }
}

impl fmt::Display for ClassificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pixels: {} clear, {} ambiguous, {} non-cloud, {} cloud, {} unprocessed, {} buffered ({}/{} tiles)",
            self.pixels,
            self.clear,
            self.ambiguous,
            self.non_cloud,
            self.cloud,
            self.unprocessed,
            self.buffered,
            self.tiles_done,
            self.tiles_total
        )
    }
}

struct TileResult {
    tile: Tile,
    flags: Array2<u16>,
    scores: Option<Array2<f32>>,
}

impl PixelClassifier {
    /// Classifier with the default buffer pass, 256-pixel tiles, the global
    /// thread pool and no score band.
    pub fn new(variant: ClassifierVariant) -> Self {
        Self {
            variant,
            buffer: Some(CloudBufferParams::default()),
            tile_size: DEFAULT_TILE_SIZE,
            mode: ProcessingMode::Parallel,
            emit_scores: false,
        }
    }

    /// Buffer pass parameters; `None` disables the pass
    pub fn with_buffer(mut self, buffer: Option<CloudBufferParams>) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scores(mut self, emit_scores: bool) -> Self {
        self.emit_scores = emit_scores;
        self
    }

    pub fn variant(&self) -> &ClassifierVariant {
        &self.variant
    }

    pub fn buffer(&self) -> Option<&CloudBufferParams> {
        self.buffer.as_ref()
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn emits_scores(&self) -> bool {
        self.emit_scores
    }

    /// Classify a scene.
    ///
    /// `bands` holds one raster per variant band, in variant order, all of
    /// the same shape. Pixels whose `validity` cell is zero, or whose
    /// sample in any band is that band's nodata, are not evaluated.
    ///
    /// `cancel` is checked before each tile. Tiles classified before
    /// cancellation are kept, the rest stay `Unprocessed`, and the buffer
    /// pass is skipped.
    ///
    /// # Errors
    /// - `ShapeMismatch` if the band count differs from the variant's
    /// - `SizeMismatch` if band or validity shapes differ
    /// - `Algorithm` if a dedicated thread pool cannot be built
    pub fn classify_raster(
        &self,
        bands: &[Raster<f64>],
        validity: Option<&Raster<u8>>,
        cancel: &CancelToken,
    ) -> Result<ClassificationOutput> {
        self.classify_raster_with_progress(bands, validity, cancel, |_| {})
    }

    /// [`PixelClassifier::classify_raster`], calling `progress` from the
    /// worker after each tile is classified.
    pub fn classify_raster_with_progress<P>(
        &self,
        bands: &[Raster<f64>],
        validity: Option<&Raster<u8>>,
        cancel: &CancelToken,
        progress: P,
    ) -> Result<ClassificationOutput>
    where
        P: Fn(&Tile) + Sync + Send,
    {
        let first = self.check_inputs(bands, validity)?;
        let (rows, cols) = first.shape();

        let tiles: Vec<Tile> = TileIterator::new(rows, cols, self.tile_size).collect();
        let tiles_total = tiles.len();
        debug!(
            "classifying {}x{} scene with '{}': {} tiles of {}, {}",
            rows,
            cols,
            self.variant.name(),
            tiles_total,
            self.tile_size,
            self.mode.label()
        );

        let results = self.mode.par_map_init(
            tiles,
            || self.variant.context(),
            |ctx, tile| {
                if cancel.is_cancelled() {
                    return None;
                }
                let result = self.classify_tile(ctx, tile, bands, validity);
                progress(&tile);
                Some(result)
            },
        )?;

        let mut flags = first.like(PixelFlag::Unprocessed.bits());
        let mut scores = self.emit_scores.then(|| first.like(f32::NAN));
        let mut tiles_done = 0;
        for result in results.into_iter().flatten() {
            let result = result?;
            let at = result.tile.extent;
            flags.write_block(at, result.flags.view())?;
            if let (Some(scores), Some(block)) = (scores.as_mut(), result.scores.as_ref()) {
                scores.write_block(at, block.view())?;
            }
            tiles_done += 1;
        }

        let cancelled = tiles_done < tiles_total;
        let buffer = match (&self.buffer, cancelled) {
            (Some(params), false) => {
                debug!(
                    "buffer pass: radius {}, trigger {:?}",
                    params.radius,
                    params.trigger.iter().map(|f| f.name()).collect::<Vec<_>>()
                );
                Some(cloud_buffer(&flags, params)?)
            }
            (Some(_), true) => {
                warn!(
                    "classification cancelled after {}/{} tiles, skipping buffer pass",
                    tiles_done, tiles_total
                );
                None
            }
            (None, true) => {
                warn!("classification cancelled after {}/{} tiles", tiles_done, tiles_total);
                None
            }
            (None, false) => None,
        };

        let summary = ClassificationSummary::tally(&flags, buffer.as_ref(), tiles_done, tiles_total);
        info!("{}: {}", self.variant.name(), summary);

        Ok(ClassificationOutput {
            flags,
            scores,
            buffer,
            summary,
            cancelled,
        })
    }

    fn check_inputs<'a>(
        &self,
        bands: &'a [Raster<f64>],
        validity: Option<&Raster<u8>>,
    ) -> Result<&'a Raster<f64>> {
        let expected = self.variant.bands().len();
        let first = bands.first().filter(|_| bands.len() == expected).ok_or(Error::ShapeMismatch {
            what: "input bands",
            expected,
            actual: bands.len(),
        })?;
        for band in &bands[1..] {
            first.ensure_same_shape(band)?;
        }
        if let Some(validity) = validity {
            first.ensure_same_shape(validity)?;
        }
        Ok(first)
    }

    fn classify_tile(
        &self,
        ctx: &mut EvaluationContext<'_>,
        tile: Tile,
        bands: &[Raster<f64>],
        validity: Option<&Raster<u8>>,
    ) -> Result<TileResult> {
        let shape = (tile.rows(), tile.cols());
        let mut flags = Array2::<u16>::zeros(shape);
        let mut scores = self.emit_scores.then(|| Array2::<f32>::from_elem(shape, f32::NAN));
        let mut raw = vec![0.0; bands.len()];

        for ((r, c), flag) in flags.indexed_iter_mut() {
            let (row, col) = tile.to_source_coords(r, c);
            let mut valid = validity.map_or(true, |v| v.data()[[row, col]] != 0);
            for (dst, band) in raw.iter_mut().zip(bands) {
                *dst = band.data()[[row, col]];
                valid &= !band.is_nodata(*dst);
            }

            let outcome = self.variant.classify_pixel(ctx, &raw, valid)?;
            *flag = outcome.flag.bits();
            if let Some(scores) = scores.as_mut() {
                scores[[r, c]] = outcome.score as f32;
            }
        }

        Ok(TileResult {
            tile,
            flags,
            scores,
        })
    }
}
