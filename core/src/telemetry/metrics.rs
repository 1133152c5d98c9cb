use serde::Serialize;
use std::sync::Mutex;

use crate::survey::record::{EstimationResult, Quality, QualityFlag};

/// Run counters, updated from the per-line workers.
pub struct RunMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub lines: usize,
    pub lines_with_marks: usize,
    pub poor_trend_lines: usize,
    pub groups: usize,
    pub ok: usize,
    pub warnings: usize,
    pub short_windows: usize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_line(&self, has_marks: bool, poor_trend: bool) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.lines += 1;
            if has_marks {
                metrics.lines_with_marks += 1;
            }
            if poor_trend {
                metrics.poor_trend_lines += 1;
            }
        }
    }

    pub fn record_result(&self, result: &EstimationResult) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.groups += 1;
            match result.quality {
                Quality::Ok => metrics.ok += 1,
                Quality::Warning => metrics.warnings += 1,
            }
            if result.flags.contains(&QualityFlag::ShortWindow) {
                metrics.short_windows += 1;
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|metrics| *metrics).unwrap_or_default()
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
