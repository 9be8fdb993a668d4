//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{Extent, RasterElement};
use ndarray::{s, Array2, ArrayView2};

/// A 2D grid of cell values.
///
/// `Raster<T>` stores values in row-major `(row, col)` order, with an
/// optional nodata value used to mask samples.
///
/// # Example
///
/// ```ignore
/// use cirrus_core::Raster;
///
/// let mut flags: Raster<u16> = Raster::new(100, 100);
/// flags.set(10, 20, 0x08)?;
/// assert_eq!(flags.get(10, 20)?, 0x08);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            nodata: None,
        }
    }

    /// Create a zeroed raster with the same shape but a different cell type
    pub fn with_same_meta<U: RasterElement>(&self) -> Raster<U> {
        Raster {
            data: Array2::zeros(self.data.dim()),
            nodata: None,
        }
    }

    /// Create a raster with the same shape, filled with a value
    pub fn like<U: RasterElement>(&self, fill_value: U) -> Raster<U> {
        Raster {
            data: Array2::from_elem(self.data.dim(), fill_value),
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fail with [`Error::SizeMismatch`] unless `other` has the same shape
    pub fn ensure_same_shape<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    /// Extent covering every cell, anchored at `(0, 0)`
    pub fn extent(&self) -> Extent {
        Extent::new(0, 0, self.cols(), self.rows())
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Copy `block` into the cells covered by `at`.
    ///
    /// # Errors
    /// - `SizeMismatch` if `block` does not have the shape of `at`
    /// - `IndexOutOfBounds` if `at` reaches past the raster
    pub fn write_block(&mut self, at: Extent, block: ArrayView2<'_, T>) -> Result<()> {
        let (br, bc) = block.dim();
        if (br, bc) != (at.height, at.width) {
            return Err(Error::SizeMismatch {
                er: at.height,
                ec: at.width,
                ar: br,
                ac: bc,
            });
        }
        if at.is_empty() {
            return Ok(());
        }
        if self.extent().intersect(&at) != Some(at) {
            return Err(Error::IndexOutOfBounds {
                row: at.y_end() - 1,
                col: at.x_end() - 1,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data
            .slice_mut(s![at.y..at.y_end(), at.x..at.x_end()])
            .assign(&block);
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }
}
