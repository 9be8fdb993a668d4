//! Raster data structures

mod element;
mod extent;
mod grid;
mod neighborhood;

pub use element::RasterElement;
pub use extent::Extent;
pub use grid::Raster;
pub use neighborhood::Window;
