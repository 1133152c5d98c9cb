use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Named conditions raised while estimating one anomaly group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    ShortWindow,
    PartialHalfwidth,
    PeakMismatch,
    #[serde(rename = "negative_depth_A")]
    NegativeDepthA,
    #[serde(rename = "negative_depth_B")]
    NegativeDepthB,
    MethodDisagreement,
    NarrowAnomaly,
    WideAnomaly,
    PoorTrendFit,
    DipoleAnomaly,
}

impl QualityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityFlag::ShortWindow => "short_window",
            QualityFlag::PartialHalfwidth => "partial_halfwidth",
            QualityFlag::PeakMismatch => "peak_mismatch",
            QualityFlag::NegativeDepthA => "negative_depth_A",
            QualityFlag::NegativeDepthB => "negative_depth_B",
            QualityFlag::MethodDisagreement => "method_disagreement",
            QualityFlag::NarrowAnomaly => "narrow_anomaly",
            QualityFlag::WideAnomaly => "wide_anomaly",
            QualityFlag::PoorTrendFit => "poor_trend_fit",
            QualityFlag::DipoleAnomaly => "dipole_anomaly",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    Ok,
    Warning,
}

impl Quality {
    pub fn from_flags(flags: &BTreeSet<QualityFlag>) -> Self {
        if flags.is_empty() {
            Quality::Ok
        } else {
            Quality::Warning
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Ok => f.write_str("OK"),
            Quality::Warning => f.write_str("WARNING"),
        }
    }
}

/// Output for one contiguous marked group on a flight line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationResult {
    pub line: usize,
    pub group: usize,
    /// Along-track position of the first and last marked bin.
    pub start_x: f64,
    pub end_x: f64,
    pub distance_a: Option<f64>,
    pub depth_a: Option<f64>,
    pub distance_b: Option<f64>,
    pub depth_b: Option<f64>,
    pub distance: Option<f64>,
    pub depth: Option<f64>,
    pub halfwidth_m: Option<f64>,
    pub b_max_nt: Option<f64>,
    pub as_max: Option<f64>,
    pub flags: BTreeSet<QualityFlag>,
    pub quality: Quality,
    /// Source rows (Mark = 1) the estimate is written to.
    #[serde(skip)]
    pub rows: Vec<usize>,
}

impl EstimationResult {
    /// Result for a group that could not be estimated at all.
    pub fn unresolved(
        line: usize,
        group: usize,
        start_x: f64,
        end_x: f64,
        flags: BTreeSet<QualityFlag>,
    ) -> Self {
        Self {
            line,
            group,
            start_x,
            end_x,
            distance_a: None,
            depth_a: None,
            distance_b: None,
            depth_b: None,
            distance: None,
            depth: None,
            halfwidth_m: None,
            b_max_nt: None,
            as_max: None,
            flags,
            quality: Quality::Warning,
            rows: Vec::new(),
        }
    }

    pub fn notes(&self) -> String {
        self.flags
            .iter()
            .map(|flag| flag.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Per-row output columns, aligned with the input table.
#[derive(Debug, Clone, Default)]
pub struct RowAnnotations {
    pub tmi_anom: Vec<f64>,
    pub reference_field: Vec<f64>,
    pub analytic_signal: Vec<f64>,
    pub distance_a: Vec<f64>,
    pub depth_a: Vec<f64>,
    pub distance_b: Vec<f64>,
    pub depth_b: Vec<f64>,
    pub distance: Vec<f64>,
    pub depth: Vec<f64>,
    pub quality: Vec<Option<Quality>>,
    pub notes: Vec<String>,
}

impl RowAnnotations {
    pub fn new(rows: usize) -> Self {
        Self {
            tmi_anom: vec![f64::NAN; rows],
            reference_field: vec![0.0; rows],
            analytic_signal: vec![f64::NAN; rows],
            distance_a: vec![f64::NAN; rows],
            depth_a: vec![f64::NAN; rows],
            distance_b: vec![f64::NAN; rows],
            depth_b: vec![f64::NAN; rows],
            distance: vec![f64::NAN; rows],
            depth: vec![f64::NAN; rows],
            quality: vec![None; rows],
            notes: vec![String::new(); rows],
        }
    }

    /// Copies a group's estimate onto each of its rows.
    pub fn apply(&mut self, result: &EstimationResult) {
        let notes = result.notes();
        for &row in &result.rows {
            self.quality[row] = Some(result.quality);
            self.notes[row] = notes.clone();
            assign(&mut self.distance_a[row], result.distance_a);
            assign(&mut self.depth_a[row], result.depth_a);
            assign(&mut self.distance_b[row], result.distance_b);
            assign(&mut self.depth_b[row], result.depth_b);
            assign(&mut self.distance[row], result.distance);
            assign(&mut self.depth[row], result.depth);
        }
    }

    pub(crate) fn row_cells(&self, row: usize, columns: &[&str]) -> Vec<String> {
        columns.iter().map(|column| self.cell(row, column)).collect()
    }

    fn cell(&self, row: usize, column: &str) -> String {
        match column {
            "TMI_anom" => format_value(self.tmi_anom[row], None),
            "IGRF_field" => format_value(self.reference_field[row], None),
            "Analytic_Signal" => format_value(self.analytic_signal[row], Some(6)),
            "Estimated_Distance_A" => format_value(self.distance_a[row], Some(4)),
            "Estimated_Depth_A" => format_value(self.depth_a[row], Some(4)),
            "Estimated_Distance_B" => format_value(self.distance_b[row], Some(4)),
            "Estimated_Depth_B" => format_value(self.depth_b[row], Some(4)),
            "Estimated_Distance" => format_value(self.distance[row], Some(4)),
            "Estimated_Depth" => format_value(self.depth[row], Some(4)),
            "Quality_Flag" => self.quality[row].map(|q| q.to_string()).unwrap_or_default(),
            "Quality_Notes" => self.notes[row].clone(),
            _ => String::new(),
        }
    }
}

fn assign(slot: &mut f64, value: Option<f64>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Empty for NaN, otherwise the (optionally rounded) shortest representation.
pub fn format_value(value: f64, decimals: Option<i32>) -> String {
    if !value.is_finite() {
        return String::new();
    }
    match decimals {
        Some(places) => {
            let scale = 10f64.powi(places);
            format!("{}", (value * scale).round() / scale)
        }
        None => format!("{}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_warning_when_any_flag_is_set() {
        let mut flags = BTreeSet::new();
        assert_eq!(Quality::from_flags(&flags), Quality::Ok);
        flags.insert(QualityFlag::DipoleAnomaly);
        assert_eq!(Quality::from_flags(&flags), Quality::Warning);
    }

    #[test]
    fn flag_names_match_output_vocabulary() {
        assert_eq!(QualityFlag::NegativeDepthA.to_string(), "negative_depth_A");
        let json = serde_json::to_string(&QualityFlag::MethodDisagreement).unwrap();
        assert_eq!(json, "\"method_disagreement\"");
    }

    #[test]
    fn format_value_rounds_and_blanks_missing() {
        assert_eq!(format_value(f64::NAN, Some(4)), "");
        assert_eq!(format_value(1.234_567, Some(4)), "1.2346");
        assert_eq!(format_value(2.0, None), "2");
    }

    #[test]
    fn apply_writes_estimates_to_group_rows_only() {
        let mut annotations = RowAnnotations::new(3);
        let mut result = EstimationResult::unresolved(0, 1, 0.0, 1.0, BTreeSet::new());
        result.distance_a = Some(1.5);
        result.quality = Quality::Ok;
        result.rows = vec![1];
        annotations.apply(&result);
        assert_eq!(annotations.distance_a[1], 1.5);
        assert!(annotations.distance_a[0].is_nan());
        assert_eq!(annotations.quality[1], Some(Quality::Ok));
        assert_eq!(annotations.quality[2], None);
    }
}
