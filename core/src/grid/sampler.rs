use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Placement of a grid in projected metres. Cell `(row, col)` sits at
/// `(origin_x + col * step_x, origin_y + row * step_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub step_x: f64,
    pub step_y: f64,
    pub width: usize,
    pub height: usize,
}

impl GridGeometry {
    /// Bilinear sample of `field` at `(x, y)`, clamped to the grid.
    /// NaN cells in the stencil propagate.
    pub fn sample(&self, field: &Array2<f64>, x: f64, y: f64) -> f64 {
        if !x.is_finite() || !y.is_finite() {
            return f64::NAN;
        }
        let (rows, cols) = field.dim();
        if rows == 0 || cols == 0 {
            return f64::NAN;
        }

        let fi = ((x - self.origin_x) / self.step_x).clamp(0.0, (cols as f64 - 1.0001).max(0.0));
        let fj = ((y - self.origin_y) / self.step_y).clamp(0.0, (rows as f64 - 1.0001).max(0.0));

        let i0 = fi.floor() as usize;
        let j0 = fj.floor() as usize;
        let i1 = (i0 + 1).min(cols - 1);
        let j1 = (j0 + 1).min(rows - 1);
        let wx = fi - i0 as f64;
        let wy = fj - j0 as f64;

        field[[j0, i0]] * (1.0 - wx) * (1.0 - wy)
            + field[[j0, i1]] * wx * (1.0 - wy)
            + field[[j1, i0]] * (1.0 - wx) * wy
            + field[[j1, i1]] * wx * wy
    }

    pub fn sample_all(&self, field: &Array2<f64>, xs: &[f64], ys: &[f64]) -> Vec<f64> {
        xs.iter()
            .zip(ys)
            .map(|(&x, &y)| self.sample(field, x, y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn unit_geometry() -> GridGeometry {
        GridGeometry {
            origin_x: 0.0,
            origin_y: 0.0,
            step_x: 1.0,
            step_y: 1.0,
            width: 2,
            height: 2,
        }
    }

    #[test]
    fn bilinear_blend_of_four_cells() {
        let field = array![[0.0, 10.0], [20.0, 30.0]];
        let geometry = unit_geometry();
        assert_relative_eq!(geometry.sample(&field, 0.5, 0.5), 15.0, epsilon = 1e-9);
        assert_relative_eq!(geometry.sample(&field, 0.0, 0.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(geometry.sample(&field, 0.25, 0.0), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn positions_outside_are_clamped() {
        let field = array![[1.0, 1.0], [1.0, 1.0]];
        let geometry = unit_geometry();
        assert_relative_eq!(geometry.sample(&field, -5.0, 12.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn nan_cells_propagate() {
        let field = array![[f64::NAN, 1.0], [1.0, 1.0]];
        assert!(unit_geometry().sample(&field, 0.5, 0.5).is_nan());
    }
}
