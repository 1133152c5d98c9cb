//! Depth and distance estimation for contiguous marked groups.
//!
//! Two independent estimators run on the padded window around each group:
//! the analytic-signal halfwidth (method A) and the field-to-signal amplitude
//! ratio (method B). Their results are turned into depths against the mean
//! above-ground altitude and reconciled into a single estimate.

use std::collections::BTreeSet;

use crate::math::stats::StatsHelper;
use crate::prelude::PipelineConfig;
use crate::processing::aggregate::AggregatedBin;
use crate::survey::record::{EstimationResult, Quality, QualityFlag};

/// Inclusive bin-index ranges of contiguous marked bins.
pub fn find_groups(bins: &[AggregatedBin]) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut open: Option<usize> = None;
    for (idx, bin) in bins.iter().enumerate() {
        match (bin.marked, open) {
            (true, None) => open = Some(idx),
            (false, Some(start)) => {
                groups.push((start, idx - 1));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        groups.push((start, bins.len() - 1));
    }
    groups
}

/// Window columns handed to the estimators, sorted by along-track position.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyWindow<'a> {
    pub x: &'a [f64],
    pub field: &'a [f64],
    pub signal: &'a [f64],
    pub marked: &'a [bool],
}

/// Raw method outputs before depth conversion.
#[derive(Debug, Clone, Default)]
pub struct WindowEstimate {
    pub distance_a: Option<f64>,
    pub distance_b: Option<f64>,
    pub halfwidth_m: Option<f64>,
    pub b_max_nt: Option<f64>,
    pub as_max: Option<f64>,
    pub flags: BTreeSet<QualityFlag>,
}

impl WindowEstimate {
    fn short() -> Self {
        let mut estimate = Self::default();
        estimate.flags.insert(QualityFlag::ShortWindow);
        estimate
    }

    /// Both methods produced a distance with neither partial nor mismatched peaks.
    pub fn has_mean(&self) -> bool {
        self.distance_a.is_some()
            && self.distance_b.is_some()
            && !self.flags.contains(&QualityFlag::PartialHalfwidth)
            && !self.flags.contains(&QualityFlag::PeakMismatch)
    }
}

/// Runs both estimators and the dipole check over one window.
pub fn estimate_window(window: &AnomalyWindow<'_>, config: &PipelineConfig) -> WindowEstimate {
    let n = window.x.len();
    let edge = ((n as f64 * config.edge_trim_fraction) as usize).max(1);
    if n < 2 * edge + 1 {
        return WindowEstimate::short();
    }

    let mut estimate = WindowEstimate::default();
    let marked_x: Vec<f64> = window
        .x
        .iter()
        .zip(window.marked)
        .filter(|(_, marked)| **marked)
        .map(|(&x, _)| x)
        .collect();
    let centre = StatsHelper::finite_mean(&marked_x)
        .or_else(|| StatsHelper::median(window.x))
        .unwrap_or(0.0);

    let trimmed_x = &window.x[edge..n - edge];
    let trimmed_signal = &window.signal[edge..n - edge];

    match find_peak(trimmed_x, trimmed_signal, centre, config.peak_search_radius_m) {
        Some(peak) => {
            estimate.as_max = Some(trimmed_signal[peak]);
            match halfwidth_crossings(trimmed_x, trimmed_signal, peak) {
                (Some(left), Some(right)) => {
                    let width = right - left;
                    if width < config.min_halfwidth_m {
                        estimate.flags.insert(QualityFlag::NarrowAnomaly);
                    } else if width > config.max_halfwidth_m {
                        estimate.flags.insert(QualityFlag::WideAnomaly);
                    }
                    estimate.halfwidth_m = Some(width);
                    estimate.distance_a = Some(config.k_factor * width);
                }
                _ => {
                    estimate.flags.insert(QualityFlag::PartialHalfwidth);
                }
            }
        }
        None => {
            estimate.flags.insert(QualityFlag::PartialHalfwidth);
        }
    }

    amplitude_ratio(window, config, &mut estimate);

    if is_dipole(window, centre, config) {
        estimate.flags.insert(QualityFlag::DipoleAnomaly);
    }

    if estimate.has_mean() {
        if let (Some(a), Some(b)) = (estimate.distance_a, estimate.distance_b) {
            if a > 0.0 && (a - b).abs() / a.max(b) > config.disagreement_threshold {
                estimate.flags.insert(QualityFlag::MethodDisagreement);
            }
        }
    }
    estimate
}

/// Strongest signal within `radius` of `centre`, else the strongest overall.
fn find_peak(x: &[f64], signal: &[f64], centre: f64, radius: f64) -> Option<usize> {
    let near: Vec<usize> = (0..x.len())
        .filter(|&i| x[i] >= centre - radius && x[i] <= centre + radius)
        .collect();
    if !near.is_empty() {
        let values: Vec<f64> = near.iter().map(|&i| signal[i]).collect();
        if let Some(best) = StatsHelper::argmax(&values) {
            return Some(near[best]);
        }
    }
    StatsHelper::argmax(signal)
}

/// Positions where the signal first falls to half its peak value on each side.
/// A crossing between two samples is linearly interpolated.
pub fn halfwidth_crossings(x: &[f64], signal: &[f64], peak: usize) -> (Option<f64>, Option<f64>) {
    let threshold = signal[peak] / 2.0;
    let interpolate = |inner: usize, outer: usize| {
        let (near, far) = (signal[inner], signal[outer]);
        if near == far {
            x[outer]
        } else {
            let t = (threshold - far) / (near - far);
            x[outer] + t * (x[inner] - x[outer])
        }
    };

    let left = (0..peak)
        .rev()
        .find(|&i| signal[i] <= threshold)
        .map(|i| interpolate(i + 1, i));
    let right = (peak + 1..signal.len())
        .find(|&i| signal[i] <= threshold)
        .map(|i| interpolate(i - 1, i));
    (left, right)
}

fn amplitude_ratio(
    window: &AnomalyWindow<'_>,
    config: &PipelineConfig,
    estimate: &mut WindowEstimate,
) {
    let marked: Vec<usize> = (0..window.x.len()).filter(|&i| window.marked[i]).collect();
    let magnitudes: Vec<f64> = marked.iter().map(|&i| window.field[i].abs()).collect();
    let Some(best) = StatsHelper::argmax(&magnitudes) else {
        estimate.flags.insert(QualityFlag::PeakMismatch);
        return;
    };

    let bin = marked[best];
    let signal = window.signal[bin];
    if signal == 0.0 || !signal.is_finite() {
        estimate.flags.insert(QualityFlag::PeakMismatch);
        return;
    }
    estimate.b_max_nt = Some(window.field[bin]);
    estimate.distance_b = Some(config.cb_factor * window.field[bin].abs() / signal);
}

fn is_dipole(window: &AnomalyWindow<'_>, centre: f64, config: &PipelineConfig) -> bool {
    let radius = config.dipole_check_radius_m;
    let (low, high) = window
        .x
        .iter()
        .zip(window.field)
        .filter(|(x, v)| (centre - radius..=centre + radius).contains(*x) && v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, &v)| (lo.min(v), hi.max(v)));
    high > 0.0 && low < -config.dipole_lobe_ratio * high
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Choice {
    A,
    B,
    Mean,
}

/// Depth of one method: clamped at zero, with a flag when clamping happened.
fn depth_of(distance: Option<f64>, altitude: Option<f64>) -> (Option<f64>, bool) {
    match (distance, altitude) {
        (Some(distance), Some(altitude)) => {
            let depth = distance - altitude;
            (Some(depth.max(0.0)), depth < 0.0)
        }
        _ => (None, false),
    }
}

/// Estimates one marked group `start..=end` of `bins`.
///
/// The caller fills in the line, group number and source rows.
pub fn process_group(
    bins: &[AggregatedBin],
    start: usize,
    end: usize,
    config: &PipelineConfig,
    poor_trend: bool,
) -> EstimationResult {
    let (start_x, end_x) = (bins[start].x, bins[end].x);
    let lo = start_x - config.window_padding_m;
    let hi = end_x + config.window_padding_m;
    let window: Vec<&AggregatedBin> = bins.iter().filter(|b| b.x >= lo && b.x <= hi).collect();

    if window.len() < config.min_window_samples {
        log::warn!(
            "Group at {:.1}-{:.1} m has {} samples in window (< {}); skipped",
            start_x,
            end_x,
            window.len(),
            config.min_window_samples
        );
        let flags = BTreeSet::from([QualityFlag::ShortWindow]);
        return EstimationResult::unresolved(0, 0, start_x, end_x, flags);
    }

    let x: Vec<f64> = window.iter().map(|b| b.x).collect();
    let field: Vec<f64> = window.iter().map(|b| b.value).collect();
    let signal: Vec<f64> = window.iter().map(|b| b.analytic_signal).collect();
    let marked: Vec<bool> = window.iter().map(|b| b.marked).collect();
    let altitudes: Vec<f64> = window.iter().map(|b| b.altitude).collect();

    let estimate = estimate_window(
        &AnomalyWindow {
            x: &x,
            field: &field,
            signal: &signal,
            marked: &marked,
        },
        config,
    );
    let mut flags = estimate.flags.clone();
    if poor_trend {
        flags.insert(QualityFlag::PoorTrendFit);
    }

    let altitude = StatsHelper::finite_mean(&altitudes);
    let (depth_a, negative_a) = depth_of(estimate.distance_a, altitude);
    let (depth_b, negative_b) = depth_of(estimate.distance_b, altitude);
    if negative_a {
        flags.insert(QualityFlag::NegativeDepthA);
    }
    if negative_b {
        flags.insert(QualityFlag::NegativeDepthB);
    }

    let choice = reconcile(&estimate, &flags, negative_a, negative_b, altitude.is_some());
    let (distance, depth) = match choice {
        Some(Choice::A) => (estimate.distance_a, depth_a),
        Some(Choice::B) => (estimate.distance_b, depth_b),
        Some(Choice::Mean) => (
            mean_of(estimate.distance_a, estimate.distance_b),
            mean_of(depth_a, depth_b),
        ),
        None => (None, None),
    };

    let quality = Quality::from_flags(&flags);
    EstimationResult {
        line: 0,
        group: 0,
        start_x,
        end_x,
        distance_a: estimate.distance_a,
        depth_a,
        distance_b: estimate.distance_b,
        depth_b,
        distance,
        depth,
        halfwidth_m: estimate.halfwidth_m,
        b_max_nt: estimate.b_max_nt,
        as_max: estimate.as_max,
        flags,
        quality,
        rows: Vec::new(),
    }
}

fn reconcile(
    estimate: &WindowEstimate,
    flags: &BTreeSet<QualityFlag>,
    negative_a: bool,
    negative_b: bool,
    has_altitude: bool,
) -> Option<Choice> {
    if estimate.has_mean() {
        // Without altitude there are no depths to compare; report the mean distance.
        if !has_altitude {
            return Some(Choice::Mean);
        }
        if negative_b && !negative_a {
            return Some(Choice::A);
        }
        if negative_a && !negative_b {
            return Some(Choice::B);
        }
        let prefer_a = !flags.contains(&QualityFlag::DipoleAnomaly)
            && flags.contains(&QualityFlag::MethodDisagreement)
            && estimate.distance_a < estimate.distance_b;
        return Some(if prefer_a { Choice::A } else { Choice::Mean });
    }
    if estimate.distance_b.is_some() {
        Some(Choice::B)
    } else if estimate.distance_a.is_some() {
        Some(Choice::A)
    } else {
        None
    }
}

fn mean_of(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some((a? + b?) / 2.0)
}
