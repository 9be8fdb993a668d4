//! Cloud buffer (square dilation of triggering flags)
//!
//! Pixels near a triggering pixel (cloud, by default) are marked in a
//! separate buffer mask. The neighborhood is the axis-aligned
//! `(2r + 1)²` square clipped to the raster; pixels that trigger
//! themselves are never marked.

use ndarray::Array2;
use crate::maybe_rayon::collect_rows;
use cirrus_core::raster::{Raster, Window};
use cirrus_core::{Algorithm, Error, FlagSet, PixelFlag, Result};

/// Parameters for the cloud buffer pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudBufferParams {
    /// Half-width of the square neighborhood; 0 marks nothing
    pub radius: usize,
    /// Source flags that trigger buffering
    pub trigger: FlagSet,
    /// Flag written into the buffer mask
    pub buffer: PixelFlag,
}

impl Default for CloudBufferParams {
    fn default() -> Self {
        Self {
            radius: 2,
            trigger: FlagSet::from(PixelFlag::Cloud),
            buffer: PixelFlag::Buffer,
        }
    }
}

/// Cloud buffer algorithm
#[derive(Debug, Clone, Default)]
pub struct CloudBuffer;

impl Algorithm for CloudBuffer {
    type Input = Raster<u16>;
    type Output = Raster<u16>;
    type Params = CloudBufferParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "CloudBuffer"
    }

    fn description(&self) -> &'static str {
        "Mark a square neighborhood around triggering flags as buffered"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        cloud_buffer(&input, &params)
    }
}

/// Mark the buffer around one pixel.
///
/// If `source[row, col]` carries any `trigger` bit, every cell of the
/// clipped square of half-width `radius` whose source value carries no
/// trigger bit gets `buffer` OR-ed into `target`. A non-triggering center
/// leaves `target` untouched.
///
/// # Errors
/// - `SizeMismatch` if `source` and `target` differ in shape
/// - `IndexOutOfBounds` if the center is outside the raster
pub fn buffer_around(
    source: &Raster<u16>,
    target: &mut Raster<u16>,
    row: usize,
    col: usize,
    radius: usize,
    trigger: FlagSet,
    buffer: PixelFlag,
) -> Result<()> {
    source.ensure_same_shape(target)?;
    if !trigger.intersects(source.get(row, col)?) {
        return Ok(());
    }

    let (rows, cols) = source.shape();
    let src = source.data();
    let dst = target.data_mut();
    for (r, c) in Window::square(row, col, radius, rows, cols).cells() {
        if !trigger.intersects(src[[r, c]]) {
            dst[[r, c]] |= buffer.bits();
        }
    }
    Ok(())
}

/// Compute the buffer mask for a whole flag raster.
///
/// The result equals calling [`buffer_around`] on a zeroed mask for every
/// pixel, but each output cell is computed independently by looking for a
/// triggering pixel in its own window. Since the window is symmetric this
/// gather gives the same cells as scattering from each trigger, and rows
/// can be processed in parallel without shared writes.
pub fn cloud_buffer(source: &Raster<u16>, params: &CloudBufferParams) -> Result<Raster<u16>> {
    let (rows, cols) = source.shape();
    let mut output = source.with_same_meta::<u16>();
    if params.radius == 0 || params.trigger.is_empty() || source.is_empty() {
        return Ok(output);
    }

    let src = source.data();
    let radius = params.radius;
    let trigger = params.trigger;
    let bit = params.buffer.bits();

    let output_data = collect_rows(rows, |row| {
        let mut row_data = vec![0_u16; cols];

        for (col, out) in row_data.iter_mut().enumerate() {
            if trigger.intersects(src[[row, col]]) {
                continue;
            }
            let window = Window::square(row, col, radius, rows, cols);
            if window.cells().any(|(r, c)| trigger.intersects(src[[r, c]])) {
                *out = bit;
            }
        }

        row_data
    });

    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), output_data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
