pub mod data;
pub mod line;
pub mod record;
pub mod table;
pub mod timestamp;

pub use data::SurveyData;
pub use line::{split_into_lines, FlightLine};
pub use record::{EstimationResult, Quality, QualityFlag, RowAnnotations};
pub use table::SurveyTable;
pub use timestamp::Timeline;
