use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::math::stats::StatsHelper;

/// One line's per-sample columns, borrowed from the survey.
#[derive(Debug, Clone, Copy)]
pub struct LineSamples<'a> {
    /// Along-track position (metres).
    pub x: &'a [f64],
    pub value: &'a [f64],
    pub analytic_signal: &'a [f64],
    pub marks: &'a [bool],
    pub altitude: &'a [f64],
    pub latitude: &'a [f64],
    pub longitude: &'a [f64],
    pub timestamps: &'a [Option<NaiveDateTime>],
}

/// Spatial bin of one flight line.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedBin {
    pub x: f64,
    pub value: f64,
    pub analytic_signal: f64,
    pub marked: bool,
    /// Mean of the non-missing altitudes, NaN if every input was missing.
    pub altitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: Option<NaiveDateTime>,
}

/// Bins samples by `floor(x / bin_m)`. Output is sorted by bin index.
/// Samples with a non-finite along-track position are left out.
pub fn aggregate_spatial(samples: &LineSamples<'_>, bin_m: f64) -> Vec<AggregatedBin> {
    let mut bins: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &x) in samples.x.iter().enumerate() {
        if !x.is_finite() {
            continue;
        }
        bins.entry((x / bin_m).floor() as i64).or_default().push(idx);
    }

    bins.into_values()
        .map(|members| {
            let gather =
                |column: &[f64]| -> Vec<f64> { members.iter().map(|&i| column[i]).collect() };
            AggregatedBin {
                x: plain_mean(&gather(samples.x)),
                value: plain_mean(&gather(samples.value)),
                analytic_signal: plain_mean(&gather(samples.analytic_signal)),
                marked: members.iter().any(|&i| samples.marks[i]),
                altitude: StatsHelper::finite_mean(&gather(samples.altitude)).unwrap_or(f64::NAN),
                latitude: plain_mean(&gather(samples.latitude)),
                longitude: plain_mean(&gather(samples.longitude)),
                timestamp: samples.timestamps[members[0]],
            }
        })
        .collect()
}

// NaN-propagating mean over a non-empty bin.
fn plain_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Columns {
        x: Vec<f64>,
        value: Vec<f64>,
        signal: Vec<f64>,
        marks: Vec<bool>,
        altitude: Vec<f64>,
        coords: Vec<f64>,
        stamps: Vec<Option<NaiveDateTime>>,
    }

    impl Columns {
        fn samples(&self) -> LineSamples<'_> {
            LineSamples {
                x: &self.x,
                value: &self.value,
                analytic_signal: &self.signal,
                marks: &self.marks,
                altitude: &self.altitude,
                latitude: &self.coords,
                longitude: &self.coords,
                timestamps: &self.stamps,
            }
        }
    }

    #[test]
    fn bins_average_values_and_or_marks() {
        let cols = Columns {
            x: vec![0.1, 0.3, 0.6, 1.2, 1.4],
            value: vec![1.0, 3.0, 5.0, 7.0, 9.0],
            signal: vec![0.0; 5],
            marks: vec![false, true, false, false, false],
            altitude: vec![f64::NAN, 4.0, f64::NAN, 2.0, 6.0],
            coords: vec![0.0; 5],
            stamps: vec![None; 5],
        };
        let bins = aggregate_spatial(&cols.samples(), 0.5);
        assert_eq!(bins.len(), 3);
        assert!((bins[0].x - 0.2).abs() < 1e-12);
        assert_eq!(bins[0].value, 2.0);
        assert!(bins[0].marked);
        assert_eq!(bins[0].altitude, 4.0);
        assert!(bins[1].altitude.is_nan());
        assert!(!bins[1].marked);
        assert_eq!(bins[2].value, 8.0);
        assert_eq!(bins[2].altitude, 4.0);
    }

    #[test]
    fn output_is_sorted_even_for_reversed_input() {
        let cols = Columns {
            x: vec![3.0, 2.0, 1.0, 0.0],
            value: vec![0.0; 4],
            signal: vec![0.0; 4],
            marks: vec![false; 4],
            altitude: vec![f64::NAN; 4],
            coords: vec![0.0; 4],
            stamps: vec![None; 4],
        };
        let bins = aggregate_spatial(&cols.samples(), 0.5);
        assert!(bins.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn empty_line_yields_no_bins() {
        let cols = Columns {
            x: vec![],
            value: vec![],
            signal: vec![],
            marks: vec![],
            altitude: vec![],
            coords: vec![],
            stamps: vec![],
        };
        assert!(aggregate_spatial(&cols.samples(), 0.5).is_empty());
    }
}
