//! Regular 2-D raster over projected survey coordinates and the
//! operations that turn it into an analytic-signal field.

pub mod analytic;
pub mod builder;
pub mod derivative;
pub mod gap_fill;
pub mod sampler;
pub mod smooth;

use ndarray::Array2;

pub use analytic::analytic_signal;
pub use builder::{build_grid, estimate_cell_size};
pub use gap_fill::fill_gaps;
pub use sampler::GridGeometry;

/// Gridded field; rows run along y, columns along x. NaN marks unknown cells.
#[derive(Debug, Clone)]
pub struct Grid {
    pub geometry: GridGeometry,
    pub values: Array2<f64>,
    /// Cells within the blanking distance of at least one occupied cell.
    pub visible: Array2<bool>,
}

impl Grid {
    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn known_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}
