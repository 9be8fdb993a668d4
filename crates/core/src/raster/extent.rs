//! Rectangular pixel extents

/// An axis-aligned rectangle of pixels.
///
/// `x` and `y` are the column and row of the top-left pixel; `width`
/// counts columns and `height` counts rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Extent {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the last column
    pub fn x_end(&self) -> usize {
        self.x + self.width
    }

    /// One past the last row
    pub fn y_end(&self) -> usize {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersection of two extents, `None` when they do not overlap
    pub fn intersect(&self, other: &Extent) -> Option<Extent> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.x_end().min(other.x_end());
        let y1 = self.y_end().min(other.y_end());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Extent::new(x0, y0, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let a = Extent::new(0, 0, 10, 10);
        let b = Extent::new(8, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Extent::new(8, 5, 2, 5)));
        assert_eq!(a.intersect(&Extent::new(10, 0, 3, 3)), None);
    }

    #[test]
    fn test_ends_are_exclusive() {
        let e = Extent::new(2, 3, 4, 5);
        assert_eq!((e.x_end(), e.y_end()), (6, 8));
        assert!(!e.is_empty());
        assert!(Extent::new(2, 3, 0, 5).is_empty());
    }
}
