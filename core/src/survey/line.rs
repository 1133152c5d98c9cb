use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Maximal run of consecutive rows without a time gap above the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLine {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl FlightLine {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits rows into flight lines. A break needs both neighbours to carry a
/// parsed timestamp and a gap strictly greater than `gap_seconds`.
pub fn split_into_lines(stamps: &[Option<NaiveDateTime>], gap_seconds: f64) -> Vec<FlightLine> {
    if stamps.is_empty() {
        return Vec::new();
    }

    let gap_ns = (gap_seconds * 1e9) as i64;
    let mut lines = Vec::new();
    let mut start = 0;
    for idx in 1..stamps.len() {
        let is_break = match (stamps[idx - 1], stamps[idx]) {
            (Some(prev), Some(next)) => (next - prev)
                .num_nanoseconds()
                .map_or(true, |delta| delta > gap_ns),
            _ => false,
        };
        if is_break {
            lines.push(FlightLine {
                index: lines.len(),
                start,
                end: idx,
            });
            start = idx;
        }
    }
    lines.push(FlightLine {
        index: lines.len(),
        start,
        end: stamps.len(),
    });
    lines
}
