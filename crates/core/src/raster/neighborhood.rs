//! Square neighborhoods clipped to raster bounds

use std::ops::Range;

/// A `(2 * radius + 1)²` square window centered on one cell and clipped
/// to the raster shape.
///
/// The window is axis-aligned; there is no disc or cross variant. Cells of
/// the nominal square that fall off the raster are simply not part of the
/// clipped window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl Window {
    /// Clip the square of half-width `radius` around `(row, col)` to a
    /// raster of shape `(n_rows, n_cols)`.
    pub fn square(row: usize, col: usize, radius: usize, n_rows: usize, n_cols: usize) -> Self {
        let r0 = row.saturating_sub(radius).min(n_rows);
        let r1 = row.saturating_add(radius).saturating_add(1).min(n_rows);
        let c0 = col.saturating_sub(radius).min(n_cols);
        let c1 = col.saturating_add(radius).saturating_add(1).min(n_cols);
        Self {
            rows: r0..r1.max(r0),
            cols: c0..c1.max(c0),
        }
    }

    /// Number of cells in the clipped window
    pub fn len(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(row, col)` pairs in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .clone()
            .flat_map(move |r| self.cols.clone().map(move |c| (r, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_window() {
        let w = Window::square(5, 5, 1, 10, 10);
        assert_eq!(w.rows, 4..7);
        assert_eq!(w.cols, 4..7);
        assert_eq!(w.len(), 9);
    }

    #[test]
    fn test_corner_window_is_clipped() {
        let w = Window::square(0, 0, 2, 10, 10);
        assert_eq!(w.rows, 0..3);
        assert_eq!(w.cols, 0..3);

        let w = Window::square(9, 9, 2, 10, 10);
        assert_eq!(w.rows, 7..10);
        assert_eq!(w.cols, 7..10);
    }

    #[test]
    fn test_radius_zero_is_center_only() {
        let w = Window::square(3, 4, 0, 10, 10);
        let cells: Vec<_> = w.cells().collect();
        assert_eq!(cells, vec![(3, 4)]);
    }

    #[test]
    fn test_huge_radius_covers_raster() {
        let w = Window::square(1, 1, usize::MAX, 4, 3);
        assert_eq!(w.len(), 12);
    }
}
