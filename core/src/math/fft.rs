use ndarray::Array2;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps the `rustfft` planner for separable 2-D transforms.
pub struct FftHelper {
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl FftHelper {
    /// Plans transforms for a `rows x cols` grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut planner = FftPlanner::new();
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            row_forward: planner.plan_fft_forward(cols),
            row_inverse: planner.plan_fft_inverse(cols),
            col_forward: planner.plan_fft_forward(rows),
            col_inverse: planner.plan_fft_inverse(rows),
            scratch: vec![Complex64::new(0.0, 0.0); rows.max(cols)],
        }
    }

    pub fn forward(&mut self, grid: &mut Array2<Complex64>) {
        let (row_fft, col_fft) = (self.row_forward.clone(), self.col_forward.clone());
        self.transform(grid, row_fft.as_ref(), col_fft.as_ref());
    }

    /// Inverse transform, normalized by `1 / (rows * cols)`.
    pub fn inverse(&mut self, grid: &mut Array2<Complex64>) {
        let (row_fft, col_fft) = (self.row_inverse.clone(), self.col_inverse.clone());
        self.transform(grid, row_fft.as_ref(), col_fft.as_ref());
        let norm = 1.0 / (grid.len().max(1) as f64);
        grid.mapv_inplace(|c| c * norm);
    }

    fn transform(
        &mut self,
        grid: &mut Array2<Complex64>,
        row_fft: &dyn Fft<f64>,
        col_fft: &dyn Fft<f64>,
    ) {
        for mut lane in grid.rows_mut() {
            let buffer = &mut self.scratch[..lane.len()];
            for (dst, src) in buffer.iter_mut().zip(lane.iter()) {
                *dst = *src;
            }
            row_fft.process(buffer);
            for (dst, src) in lane.iter_mut().zip(buffer.iter()) {
                *dst = *src;
            }
        }

        for mut lane in grid.columns_mut() {
            let buffer = &mut self.scratch[..lane.len()];
            for (dst, src) in buffer.iter_mut().zip(lane.iter()) {
                *dst = *src;
            }
            col_fft.process(buffer);
            for (dst, src) in lane.iter_mut().zip(buffer.iter()) {
                *dst = *src;
            }
        }
    }
}

/// Signed wavenumber index for position `j` in an `n`-point transform.
pub fn centered_index(j: usize, n: usize) -> f64 {
    if j <= n / 2 {
        j as f64
    } else {
        j as f64 - n as f64
    }
}
