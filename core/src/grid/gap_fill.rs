//! Priority-ordered inverse-distance gap filling.
//!
//! Unknown cells are committed one at a time, always picking the cell whose
//! known 8-neighbours contribute the largest inverse-distance weight. The
//! heap may hold several entries for the same cell; entries for cells that
//! were already filled are discarded on pop.

use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy)]
struct PendingCell {
    weight: f64,
    row: usize,
    col: usize,
}

impl PartialEq for PendingCell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingCell {}

impl PartialOrd for PendingCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingCell {
    // Heaviest first; ties go to the lower (row, col) so the fill order is
    // deterministic.
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| (other.row, other.col).cmp(&(self.row, self.col)))
    }
}

/// Fills every NaN cell connected to a known cell through 8-adjacency.
/// `cell_width` spaces columns, `cell_height` spaces rows. Cells in
/// components without any known cell stay NaN.
pub fn fill_gaps(grid: &mut Array2<f64>, cell_width: f64, cell_height: f64) {
    let (rows, cols) = grid.dim();
    let inverse_distance: Vec<f64> = OFFSETS
        .iter()
        .map(|&(di, dj)| 1.0 / (dj as f64 * cell_width).hypot(di as f64 * cell_height))
        .collect();

    let neighbours = move |i: usize, j: usize| {
        OFFSETS.iter().enumerate().filter_map(move |(k, &(di, dj))| {
            let ni = i as i64 + di;
            let nj = j as i64 + dj;
            let inside = ni >= 0 && nj >= 0 && ni < rows as i64 && nj < cols as i64;
            inside.then_some((ni as usize, nj as usize, k))
        })
    };

    let mut weights = Array2::<f64>::zeros((rows, cols));
    let mut heap = BinaryHeap::new();
    for i in 0..rows {
        for j in 0..cols {
            if !grid[[i, j]].is_nan() {
                continue;
            }
            let weight: f64 = neighbours(i, j)
                .filter(|&(ni, nj, _)| !grid[[ni, nj]].is_nan())
                .map(|(_, _, k)| inverse_distance[k])
                .sum();
            weights[[i, j]] = weight;
            if weight > 0.0 {
                heap.push(PendingCell { weight, row: i, col: j });
            }
        }
    }

    while let Some(PendingCell { row, col, .. }) = heap.pop() {
        if !grid[[row, col]].is_nan() {
            continue;
        }

        let (sum, weight_sum) = neighbours(row, col)
            .filter_map(|(ni, nj, k)| {
                let v = grid[[ni, nj]];
                (!v.is_nan()).then(|| (v * inverse_distance[k], inverse_distance[k]))
            })
            .fold((0.0, 0.0), |(s, w), (vs, vw)| (s + vs, w + vw));
        grid[[row, col]] = if weight_sum > 0.0 { sum / weight_sum } else { f64::NAN };

        for (ni, nj, k) in neighbours(row, col) {
            if !grid[[ni, nj]].is_nan() {
                continue;
            }
            weights[[ni, nj]] += inverse_distance[k];
            heap.push(PendingCell {
                weight: weights[[ni, nj]],
                row: ni,
                col: nj,
            });
        }
    }
}
