use serde::{Deserialize, Serialize};

/// Numeric parameters shared by every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Time gap (seconds) that starts a new flight line.
    pub line_gap_seconds: f64,
    pub trend_degree: usize,
    pub min_trend_samples: usize,
    /// Along-track padding (metres) added on both sides of a marked group.
    pub window_padding_m: f64,
    pub min_window_samples: usize,
    /// Halfwidth-to-distance factor of the vertical-dipole model.
    pub k_factor: f64,
    /// Amplitude-ratio-to-distance factor.
    pub cb_factor: f64,
    pub peak_search_radius_m: f64,
    pub dipole_check_radius_m: f64,
    /// Negative lobe must exceed this fraction of the positive lobe.
    pub dipole_lobe_ratio: f64,
    pub disagreement_threshold: f64,
    pub min_halfwidth_m: f64,
    pub max_halfwidth_m: f64,
    pub spatial_bin_m: f64,
    /// Fraction of the window trimmed from each edge before the peak search.
    pub edge_trim_fraction: f64,
    /// Grid cell size in metres, estimated from the data when absent.
    pub cell_size_m: Option<f64>,
    /// Blanking distance in metres, 10 x cell size when absent.
    pub blanking_distance_m: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line_gap_seconds: 30.0,
            trend_degree: 1,
            min_trend_samples: 10,
            window_padding_m: 20.0,
            min_window_samples: 20,
            k_factor: 0.7111,
            cb_factor: 1.910,
            peak_search_radius_m: 5.0,
            dipole_check_radius_m: 15.0,
            dipole_lobe_ratio: 0.15,
            disagreement_threshold: 0.35,
            min_halfwidth_m: 0.5,
            max_halfwidth_m: 100.0,
            spatial_bin_m: 0.5,
            edge_trim_fraction: 0.10,
            cell_size_m: None,
            blanking_distance_m: None,
        }
    }
}

/// Names of the input columns the pipeline reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub field: String,
    pub latitude: String,
    pub longitude: String,
    pub mark: String,
    pub altitude_amsl: Option<String>,
    pub altitude_agl: Option<String>,
    pub timestamp: String,
    pub date: String,
    pub time: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            field: "TMI".to_string(),
            latitude: "Latitude".to_string(),
            longitude: "Longitude".to_string(),
            mark: "Mark".to_string(),
            altitude_amsl: None,
            altitude_agl: Some("Altitude AGL".to_string()),
            timestamp: "Timestamp".to_string(),
            date: "Date".to_string(),
            time: "Time".to_string(),
        }
    }
}

/// Fatal conditions that abort a run before any output is written.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("column is not numeric: {0}")]
    NonNumericColumn(String),
    #[error("no valid data points for gridding")]
    EmptyGridInput,
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(f64),
    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
