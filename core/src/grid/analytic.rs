use ndarray::{Array2, Zip};

use crate::grid::derivative::{x_derivative, y_derivative, z_derivative};
use crate::grid::gap_fill::fill_gaps;

/// Analytic-signal magnitude `sqrt(dx² + dy² + dz²)`.
///
/// Derivatives are taken on a gap-filled copy of `grid`; every cell that is
/// NaN in `grid` itself is NaN in the result.
pub fn analytic_signal(grid: &Array2<f64>, cell_width: f64, cell_height: f64) -> Array2<f64> {
    let (rows, cols) = grid.dim();
    log::info!("Computing 2D analytic signal on {} x {} grid", rows, cols);

    let mut filled = grid.clone();
    fill_gaps(&mut filled, cell_width, cell_height);

    let dx = x_derivative(&filled, cell_width);
    let dy = y_derivative(&filled, cell_height);
    let dz = z_derivative(&filled, cell_width, cell_height);

    let mut magnitude = Array2::zeros((rows, cols));
    Zip::from(&mut magnitude)
        .and(grid)
        .and(&dx)
        .and(&dy)
        .and(&dz)
        .for_each(|out, &original, &gx, &gy, &gz| {
            *out = if original.is_nan() {
                f64::NAN
            } else {
                (gx * gx + gy * gy + gz * gz).sqrt()
            };
        });
    magnitude
}
