pub mod aggregate;
pub mod anomaly;
pub mod geometry;
pub mod pipeline;
pub mod trend;

pub use aggregate::{aggregate_spatial, AggregatedBin, LineSamples};
pub use anomaly::{estimate_window, find_groups, process_group, AnomalyWindow, WindowEstimate};
pub use geometry::{along_track, LocalProjection};
pub use pipeline::{estimate_line, PipelineOutput, RunSummary, SurveyPipeline};
pub use trend::{remove_trend, TrendOutcome};
