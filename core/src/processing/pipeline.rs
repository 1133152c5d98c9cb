//! End-to-end single-sensor estimation over one survey table.

use rayon::prelude::*;
use serde::Serialize;

use crate::grid::{analytic_signal, build_grid, estimate_cell_size, GridGeometry};
use crate::prelude::{ColumnConfig, PipelineConfig, PipelineResult};
use crate::processing::aggregate::{aggregate_spatial, LineSamples};
use crate::processing::anomaly::{find_groups, process_group};
use crate::processing::geometry::{along_track, LocalProjection};
use crate::processing::trend::remove_trend;
use crate::reference::{background_field, ReferenceField};
use crate::survey::{
    split_into_lines, EstimationResult, FlightLine, RowAnnotations, SurveyData, SurveyTable,
};
use crate::telemetry::{MetricsSnapshot, RunMetrics, StageLogger};

/// Everything a run produces, aligned with the input rows.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub annotations: RowAnnotations,
    pub results: Vec<EstimationResult>,
    /// Rows with Mark = 1; these make up the targets file.
    pub marks: Vec<bool>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub marked_rows: usize,
    pub cell_size_m: f64,
    pub grid: GridGeometry,
    pub synthetic_timestamps: bool,
    pub metrics: MetricsSnapshot,
}

pub struct SurveyPipeline {
    config: PipelineConfig,
    columns: ColumnConfig,
    reference: Option<Box<dyn ReferenceField>>,
    logger: StageLogger,
}

impl SurveyPipeline {
    pub fn new(config: PipelineConfig, columns: ColumnConfig) -> Self {
        Self {
            config,
            columns,
            reference: None,
            logger: StageLogger::new("pipeline"),
        }
    }

    pub fn with_reference(mut self, reference: Box<dyn ReferenceField>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Runs every stage. Returns `Ok(None)` when the table has no marked
    /// rows; schema and grid failures abort with an error.
    pub fn run(&self, table: &SurveyTable) -> PipelineResult<Option<PipelineOutput>> {
        let data = SurveyData::from_table(table, &self.columns)?;
        let metrics = RunMetrics::new();
        if !data.has_mark_column {
            self.logger
                .record(&format!("No '{}' column found. Nothing to do.", self.columns.mark));
            return Ok(None);
        }
        let marked_rows = data.marked_count();
        if marked_rows == 0 {
            self.logger.record("No rows with Mark == 1. Nothing to do.");
            return Ok(None);
        }
        self.logger
            .record(&format!("{} marked row(s) out of {}", marked_rows, data.len()));
        if !data.has_agl {
            self.logger
                .warn("No above-ground altitude column; depths will be left empty");
        }

        let background = background_field(
            self.reference.as_deref(),
            &data.longitude,
            &data.latitude,
            &data.reference_altitude_m,
            &data.timeline.dates(),
        );
        let anomaly: Vec<f64> = data.field.iter().zip(&background).map(|(f, b)| f - b).collect();

        let along = along_track(&data.latitude, &data.longitude);
        let lines = split_into_lines(&data.timeline.stamps, self.config.line_gap_seconds);
        self.logger.record(&format!("Found {} flight line(s)", lines.len()));

        let trends: Vec<_> = lines
            .par_iter()
            .map(|line| {
                let rows = line.rows();
                remove_trend(
                    &anomaly[rows.clone()],
                    &along[rows.clone()],
                    &data.marks[rows],
                    self.config.trend_degree,
                    self.config.min_trend_samples,
                )
            })
            .collect();
        let mut detrended = anomaly;
        let mut poor_trend = vec![false; lines.len()];
        for ((line, outcome), poor) in lines.iter().zip(trends).zip(poor_trend.iter_mut()) {
            if outcome.poor_fit {
                self.logger.warn(&format!(
                    "Line {}: fewer than {} unmarked samples, trend removal skipped",
                    line.index, self.config.min_trend_samples
                ));
            }
            *poor = outcome.poor_fit;
            detrended[line.rows()].copy_from_slice(&outcome.values);
        }

        let projection = LocalProjection::centred_on(&data.latitude, &data.longitude);
        let (xs, ys) = projection.project_all(&data.latitude, &data.longitude);
        let cell_size = match self.config.cell_size_m {
            Some(size) => size,
            None => {
                let size = estimate_cell_size(&xs, &ys, &lines);
                self.logger.record(&format!("Auto cell size: {:.3} m", size));
                size
            }
        };

        let grid = build_grid(&xs, &ys, &detrended, cell_size, self.config.blanking_distance_m)?;
        self.logger.record(&format!(
            "Grid {} x {}: {} known cell(s)",
            grid.width(),
            grid.height(),
            grid.known_count()
        ));
        let signal_grid = analytic_signal(&grid.values, grid.geometry.step_x, grid.geometry.step_y);
        let signal: Vec<f64> = grid
            .geometry
            .sample_all(&signal_grid, &xs, &ys)
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v })
            .collect();

        let per_line: Vec<Vec<EstimationResult>> = lines
            .par_iter()
            .zip(poor_trend.par_iter())
            .map(|(line, &poor)| {
                let rows = line.rows();
                let has_marks = data.marks[rows.clone()].iter().any(|&m| m);
                metrics.record_line(has_marks, poor);
                if !has_marks {
                    return Vec::new();
                }
                let samples = LineSamples {
                    x: &along[rows.clone()],
                    value: &detrended[rows.clone()],
                    analytic_signal: &signal[rows.clone()],
                    marks: &data.marks[rows.clone()],
                    altitude: &data.altitude_agl[rows.clone()],
                    latitude: &data.latitude[rows.clone()],
                    longitude: &data.longitude[rows.clone()],
                    timestamps: &data.timeline.stamps[rows],
                };
                let results = estimate_line(line, &samples, &self.config, poor);
                for result in &results {
                    metrics.record_result(result);
                }
                results
            })
            .collect();

        let mut annotations = RowAnnotations::new(data.len());
        annotations.tmi_anom = detrended;
        annotations.reference_field = background;
        annotations.analytic_signal = signal;

        let mut results: Vec<EstimationResult> = per_line.into_iter().flatten().collect();
        for (id, result) in results.iter_mut().enumerate() {
            result.group = id + 1;
            annotations.apply(result);
        }
        self.logger
            .record(&format!("Done. {} anomaly group(s) processed.", results.len()));

        Ok(Some(PipelineOutput {
            annotations,
            results,
            marks: data.marks,
            summary: RunSummary {
                rows: table.len(),
                marked_rows,
                cell_size_m: cell_size,
                grid: grid.geometry,
                synthetic_timestamps: data.timeline.synthetic,
                metrics: metrics.snapshot(),
            },
        }))
    }
}

/// Aggregates one line, finds its marked groups and estimates each one.
///
/// `samples` covers exactly the rows of `line`; the returned results carry
/// absolute row indices and are numbered within the line.
pub fn estimate_line(
    line: &FlightLine,
    samples: &LineSamples<'_>,
    config: &PipelineConfig,
    poor_trend: bool,
) -> Vec<EstimationResult> {
    let bins = aggregate_spatial(samples, config.spatial_bin_m);
    find_groups(&bins)
        .into_iter()
        .enumerate()
        .map(|(idx, (start, end))| {
            let mut result = process_group(&bins, start, end, config, poor_trend);
            let lo = result.start_x - config.spatial_bin_m;
            let hi = result.end_x + config.spatial_bin_m;
            result.line = line.index;
            result.group = idx + 1;
            result.rows = samples
                .x
                .iter()
                .zip(samples.marks)
                .enumerate()
                .filter(|(_, (x, marked))| **marked && (lo..=hi).contains(*x))
                .map(|(offset, _)| line.start + offset)
                .collect();
            result
        })
        .collect()
}
