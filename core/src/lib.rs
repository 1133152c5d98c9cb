//! Core processing for single-sensor magnetometer depth estimation.
//!
//! A survey table is split into flight lines, detrended, gridded and turned
//! into an analytic-signal field; every marked anomaly is then sized by the
//! halfwidth and amplitude-ratio methods and given a quality verdict.

pub mod grid;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod reference;
pub mod survey;
pub mod telemetry;

pub use prelude::{ColumnConfig, PipelineConfig, PipelineError, PipelineResult};
pub use processing::{PipelineOutput, RunSummary, SurveyPipeline};
pub use reference::{ConstantField, ReferenceError, ReferenceField};
