use ndarray::{Array1, Array2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Solve `a · x = b` by Gaussian elimination with partial pivoting.
    /// Returns `None` for singular systems.
    pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
        let n = b.len();
        if a.nrows() != n || a.ncols() != n {
            return None;
        }

        for col in 0..n {
            let pivot =
                (col..n).max_by(|&r1, &r2| a[[r1, col]].abs().total_cmp(&a[[r2, col]].abs()))?;
            if a[[pivot, col]].abs() < 1e-12 {
                return None;
            }
            if pivot != col {
                for k in 0..n {
                    a.swap([pivot, k], [col, k]);
                }
                b.swap(pivot, col);
            }
            for row in col + 1..n {
                let factor = a[[row, col]] / a[[col, col]];
                for k in col..n {
                    a[[row, k]] -= factor * a[[col, k]];
                }
                b[row] -= factor * b[col];
            }
        }

        let mut x = Array1::<f64>::zeros(n);
        for row in (0..n).rev() {
            let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
            x[row] = (b[row] - tail) / a[[row, row]];
        }
        Some(x)
    }

    /// Least-squares polynomial fit; coefficients are lowest order first.
    /// Abscissae are centred and scaled internally, so the returned fit is
    /// evaluated through [`PolyFit::eval`].
    pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<PolyFit> {
        let count = x.len().min(y.len());
        if count <= degree {
            return None;
        }
        let centre = x[..count].iter().sum::<f64>() / count as f64;
        let scale = x[..count]
            .iter()
            .map(|v| (v - centre).abs())
            .fold(0.0, f64::max)
            .max(1e-12);

        let terms = degree + 1;
        let mut normal = Array2::<f64>::zeros((terms, terms));
        let mut rhs = Array1::<f64>::zeros(terms);
        for (&xi, &yi) in x[..count].iter().zip(&y[..count]) {
            let t = (xi - centre) / scale;
            let powers: Vec<f64> = (0..terms).map(|p| t.powi(p as i32)).collect();
            for r in 0..terms {
                rhs[r] += powers[r] * yi;
                for c in 0..terms {
                    normal[[r, c]] += powers[r] * powers[c];
                }
            }
        }

        let coefficients = Self::solve(normal, rhs)?;
        Some(PolyFit {
            coefficients: coefficients.to_vec(),
            centre,
            scale,
        })
    }
}

/// Polynomial fitted in normalized abscissa `(x - centre) / scale`.
#[derive(Debug, Clone)]
pub struct PolyFit {
    pub coefficients: Vec<f64>,
    centre: f64,
    scale: f64,
}

impl PolyFit {
    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.centre) / self.scale;
        self.coefficients.iter().rev().fold(0.0, |acc, &c| acc * t + c)
    }
}
