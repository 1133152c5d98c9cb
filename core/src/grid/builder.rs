use ndarray::Array2;
use std::collections::BTreeMap;

use crate::grid::sampler::GridGeometry;
use crate::grid::smooth::smooth_fill;
use crate::grid::Grid;
use crate::math::stats::StatsHelper;
use crate::prelude::{PipelineError, PipelineResult};
use crate::survey::line::FlightLine;

/// Median along-track point spacing across lines, falling back to
/// `extent / 200` and finally to 1 m.
pub fn estimate_cell_size(xs: &[f64], ys: &[f64], lines: &[FlightLine]) -> f64 {
    let spacings: Vec<f64> = lines
        .iter()
        .filter(|line| line.len() >= 2)
        .filter_map(|line| {
            let segments: Vec<f64> = line
                .rows()
                .skip(1)
                .map(|i| (xs[i] - xs[i - 1]).hypot(ys[i] - ys[i - 1]))
                .collect();
            StatsHelper::median(&segments)
        })
        .collect();
    if let Some(size) = StatsHelper::median(&spacings) {
        if size > 0.0 {
            return size;
        }
    }

    let extent = axis_extent(xs).max(axis_extent(ys));
    if extent > 0.0 {
        extent / 200.0
    } else {
        1.0
    }
}

fn axis_extent(values: &[f64]) -> f64 {
    let (lo, hi) = finite_bounds(values.iter().copied());
    if hi >= lo {
        hi - lo
    } else {
        0.0
    }
}

fn finite_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Bins scattered `(x, y, value)` points into a regular grid.
///
/// Each occupied cell holds the median of its points. Cells within the
/// blanking distance of an occupied cell are visible; visible empty cells are
/// seeded with the global median and then relaxed by [`smooth_fill`]. Cells
/// outside the visibility mask end up NaN.
pub fn build_grid(
    xs: &[f64],
    ys: &[f64],
    values: &[f64],
    cell_size: f64,
    blanking_distance: Option<f64>,
) -> PipelineResult<Grid> {
    if !(cell_size > 0.0) {
        return Err(PipelineError::InvalidCellSize(cell_size));
    }

    let points: Vec<(f64, f64, f64)> = xs
        .iter()
        .zip(ys)
        .zip(values)
        .map(|((&x, &y), &v)| (x, y, v))
        .filter(|(x, y, v)| x.is_finite() && y.is_finite() && v.is_finite())
        .collect();
    if points.is_empty() {
        return Err(PipelineError::EmptyGridInput);
    }

    let (x_min, x_max) = finite_bounds(points.iter().map(|p| p.0));
    let (y_min, y_max) = finite_bounds(points.iter().map(|p| p.1));
    let width = (((x_max - x_min) / cell_size) as usize).max(2);
    let height = (((y_max - y_min) / cell_size) as usize).max(2);
    let step = |extent: f64, cells: usize| {
        if extent > 0.0 {
            extent / (cells - 1) as f64
        } else {
            cell_size
        }
    };
    let geometry = GridGeometry {
        origin_x: x_min,
        origin_y: y_min,
        step_x: step(x_max - x_min, width),
        step_y: step(y_max - y_min, height),
        width,
        height,
    };
    log::info!("Grid: {} x {} cells ({} total)", width, height, width * height);

    let mut cells: BTreeMap<(usize, usize), Vec<f64>> = BTreeMap::new();
    for &(x, y, v) in &points {
        let col = (((x - x_min) / geometry.step_x) as usize).min(width - 1);
        let row = (((y - y_min) / geometry.step_y) as usize).min(height - 1);
        cells.entry((row, col)).or_default().push(v);
    }

    let mut grid = Array2::from_elem((height, width), f64::NAN);
    for (&(row, col), cell_values) in &cells {
        grid[[row, col]] = StatsHelper::median(cell_values).unwrap_or(f64::NAN);
    }

    let blanking = blanking_distance.unwrap_or(cell_size * 10.0);
    let reach = ((blanking / cell_size) as usize).max(1);
    let mut visible = Array2::from_elem((height, width), false);
    for &(row, col) in cells.keys() {
        let rows = row.saturating_sub(reach)..(row + reach + 1).min(height);
        let cols = col.saturating_sub(reach)..(col + reach + 1).min(width);
        for r in rows {
            for c in cols.clone() {
                visible[[r, c]] = true;
            }
        }
    }

    let needs_fill =
        Array2::from_shape_fn((height, width), |(r, c)| grid[[r, c]].is_nan() && visible[[r, c]]);
    let known: Vec<f64> = grid.iter().copied().filter(|v| v.is_finite()).collect();
    if let Some(global_median) = StatsHelper::median(&known) {
        for (value, &fill) in grid.iter_mut().zip(needs_fill.iter()) {
            if fill {
                *value = global_median;
            }
        }
    }
    if needs_fill.iter().any(|&f| f) && known.len() >= 4 {
        let method = smooth_fill(&mut grid, &needs_fill);
        log::debug!("seed fill used {:?} relaxation", method);
    }

    for (value, &is_visible) in grid.iter_mut().zip(visible.iter()) {
        if !is_visible {
            *value = f64::NAN;
        }
    }

    Ok(Grid {
        geometry,
        values: grid,
        visible,
    })
}
