//! Horizontal finite-difference and vertical wavenumber-domain derivatives.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use num_complex::Complex64;

use crate::math::fft::{centered_index, FftHelper};

/// Derivative of one row or column with spacing `h`.
///
/// Interior points use the 5-point stencil when all four neighbours are
/// known, then the centred difference; the two end points use a one-sided
/// difference. Anything else stays NaN.
pub fn derivative_line(values: ArrayView1<'_, f64>, h: f64) -> Array1<f64> {
    let n = values.len();
    let f = |k: usize| values[k];
    let known = |k: usize| !values[k].is_nan();

    Array1::from_shape_fn(n, |j| {
        if j >= 2 && j + 2 < n && known(j - 2) && known(j - 1) && known(j + 1) && known(j + 2) {
            return (-f(j + 2) + 8.0 * f(j + 1) - 8.0 * f(j - 1) + f(j - 2)) / (12.0 * h);
        }
        if j >= 1 && j + 1 < n && known(j - 1) && known(j + 1) {
            return (f(j + 1) - f(j - 1)) / (2.0 * h);
        }
        if n >= 2 && j == 0 && known(0) && known(1) {
            return (f(1) - f(0)) / h;
        }
        if n >= 2 && j == n - 1 && known(n - 1) && known(n - 2) {
            return (f(n - 1) - f(n - 2)) / h;
        }
        f64::NAN
    })
}

/// d/dx along each row (columns are spaced `cell_width`).
pub fn x_derivative(grid: &Array2<f64>, cell_width: f64) -> Array2<f64> {
    along_axis(grid, Axis(1), cell_width)
}

/// d/dy along each column (rows are spaced `cell_height`).
pub fn y_derivative(grid: &Array2<f64>, cell_height: f64) -> Array2<f64> {
    along_axis(grid, Axis(0), cell_height)
}

fn along_axis(grid: &Array2<f64>, axis: Axis, h: f64) -> Array2<f64> {
    let mut out = Array2::from_elem(grid.dim(), f64::NAN);
    for (src, mut dst) in grid.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        dst.assign(&derivative_line(src, h));
    }
    out
}

/// Vertical derivative by multiplying the 2-D spectrum with |k|.
/// NaN cells enter the transform as 0; the grid is treated as periodic.
pub fn z_derivative(grid: &Array2<f64>, cell_width: f64, cell_height: f64) -> Array2<f64> {
    let (rows, cols) = grid.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((rows, cols));
    }

    let mut spectrum = grid.mapv(|v| Complex64::new(if v.is_nan() { 0.0 } else { v }, 0.0));
    let mut fft = FftHelper::new(rows, cols);
    fft.forward(&mut spectrum);

    let dkx = 2.0 * std::f64::consts::PI / (cols as f64 * cell_width);
    let dky = 2.0 * std::f64::consts::PI / (rows as f64 * cell_height);
    for ((i, j), coefficient) in spectrum.indexed_iter_mut() {
        let kx = centered_index(j, cols) * dkx;
        let ky = centered_index(i, rows) * dky;
        *coefficient *= kx.hypot(ky);
    }

    fft.inverse(&mut spectrum);
    spectrum.mapv(|c| c.re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array};

    #[test]
    fn stencil_regimes_on_squares() {
        let row = array![0.0, 1.0, 4.0, 9.0, 16.0, 25.0, 36.0];
        let d = derivative_line(row.view(), 1.0);
        let expected = [1.0, 2.0, 4.0, 6.0, 8.0, 10.0, 11.0];
        for (got, want) in d.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn five_point_stencil_falls_back_when_outer_neighbour_missing() {
        let row = array![f64::NAN, 1.0, 4.0, 9.0, 16.0, 25.0, 36.0];
        let d = derivative_line(row.view(), 0.5);
        assert!(d[0].is_nan());
        assert!(d[1].is_nan());
        // j = 2 lost its j-2 neighbour, so the centred difference applies.
        assert_relative_eq!(d[2], (9.0 - 1.0) / (2.0 * 0.5), epsilon = 1e-12);
        assert_relative_eq!(d[3], 12.0, epsilon = 1e-12);
    }

    #[test]
    fn isolated_value_has_no_derivative() {
        let row = array![f64::NAN, 3.0, f64::NAN];
        assert!(derivative_line(row.view(), 1.0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn x_and_y_derivatives_are_transposes() {
        let grid = Array::from_shape_fn((5, 6), |(i, j)| (i * i) as f64 + 3.0 * j as f64);
        let dx = x_derivative(&grid, 2.0);
        let dy = y_derivative(&grid, 1.0);
        assert!(dx.iter().all(|&v| (v - 1.5).abs() < 1e-12));
        assert_relative_eq!(dy[[2, 0]], 4.0, epsilon = 1e-12);
        assert_relative_eq!(dy[[0, 3]], 1.0, epsilon = 1e-12);
        let dy_t = x_derivative(&grid.t().to_owned(), 1.0);
        assert_eq!(dy_t.t(), dy);
    }

    #[test]
    fn vertical_derivative_of_plane_wave_scales_by_wavenumber() {
        let (rows, cols, h) = (16, 32, 0.5);
        let grid = Array::from_shape_fn((rows, cols), |(_, j)| {
            (2.0 * std::f64::consts::PI * 3.0 * j as f64 / cols as f64).cos()
        });
        let dz = z_derivative(&grid, h, h);
        let k = 2.0 * std::f64::consts::PI * 3.0 / (cols as f64 * h);
        for ((_, j), &v) in dz.indexed_iter() {
            assert_relative_eq!(v, k * grid[[0, j]], epsilon = 1e-9);
        }
    }

    #[test]
    fn vertical_derivative_of_constant_is_zero() {
        let grid = Array2::from_elem((4, 4), 7.0);
        assert!(z_derivative(&grid, 1.0, 1.0).iter().all(|v| v.abs() < 1e-12));
    }
}
