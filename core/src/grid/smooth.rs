//! Best-effort smooth seed fill used while building the grid.
//!
//! Free cells are relaxed towards a minimum-curvature (biharmonic) surface
//! with the occupied cells held fixed. If that relaxation blows up, the pass
//! degrades to a harmonic (membrane) surface, which is always bounded by
//! its neighbours.

use ndarray::Array2;

const MAX_ITERATIONS: usize = 200;
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothMethod {
    Biharmonic,
    Harmonic,
}

/// Relaxes the cells flagged in `free` in place. Cells that are NaN and not
/// free act as holes: they are never read or written.
pub fn smooth_fill(values: &mut Array2<f64>, free: &Array2<bool>) -> SmoothMethod {
    let span = value_span(values, free);
    let tolerance = TOLERANCE * span.max(1e-12);

    let mut trial = values.clone();
    if relax(&mut trial, free, tolerance, true) {
        *values = trial;
        return SmoothMethod::Biharmonic;
    }

    log::debug!("biharmonic seed fill diverged; using harmonic relaxation");
    relax(values, free, tolerance, false);
    SmoothMethod::Harmonic
}

fn value_span(values: &Array2<f64>, free: &Array2<bool>) -> f64 {
    let (lo, hi) = values
        .iter()
        .zip(free.iter())
        .filter(|(v, is_free)| !**is_free && v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (&v, _)| (lo.min(v), hi.max(v)));
    if hi >= lo {
        hi - lo
    } else {
        0.0
    }
}

// Gauss-Seidel sweeps. Returns false once an update is non-finite or exceeds
// a thousand times the largest starting magnitude.
fn relax(values: &mut Array2<f64>, free: &Array2<bool>, tolerance: f64, biharmonic: bool) -> bool {
    let (rows, cols) = values.dim();
    let limit = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        * 1e3
        + 1.0;

    for _ in 0..MAX_ITERATIONS {
        let mut max_change = 0.0f64;
        for i in 0..rows {
            for j in 0..cols {
                if !free[[i, j]] {
                    continue;
                }
                let update = if biharmonic {
                    biharmonic_update(values, i, j).or_else(|| harmonic_update(values, i, j))
                } else {
                    harmonic_update(values, i, j)
                };
                let Some(next) = update else { continue };
                if !next.is_finite() || next.abs() > limit {
                    return false;
                }
                max_change = max_change.max((next - values[[i, j]]).abs());
                values[[i, j]] = next;
            }
        }
        if max_change <= tolerance {
            break;
        }
    }
    true
}

fn harmonic_update(values: &Array2<f64>, i: usize, j: usize) -> Option<f64> {
    let (rows, cols) = values.dim();
    let mut sum = 0.0;
    let mut count = 0usize;
    for (di, dj) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
        if let Some(v) = neighbour(values, rows, cols, i, j, di, dj) {
            sum += v;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

// 13-point minimum-curvature stencil; needs the full stencil to be present.
fn biharmonic_update(values: &Array2<f64>, i: usize, j: usize) -> Option<f64> {
    let (rows, cols) = values.dim();
    let at = |di: i64, dj: i64| neighbour(values, rows, cols, i, j, di, dj);

    let edges = at(-1, 0)? + at(1, 0)? + at(0, -1)? + at(0, 1)?;
    let corners = at(-1, -1)? + at(-1, 1)? + at(1, -1)? + at(1, 1)?;
    let far = at(-2, 0)? + at(2, 0)? + at(0, -2)? + at(0, 2)?;
    Some((8.0 * edges - 2.0 * corners - far) / 20.0)
}

fn neighbour(
    values: &Array2<f64>,
    rows: usize,
    cols: usize,
    i: usize,
    j: usize,
    di: i64,
    dj: i64,
) -> Option<f64> {
    let ni = i as i64 + di;
    let nj = j as i64 + dj;
    if ni < 0 || nj < 0 || ni >= rows as i64 || nj >= cols as i64 {
        return None;
    }
    let v = values[[ni as usize, nj as usize]];
    v.is_finite().then_some(v)
}
