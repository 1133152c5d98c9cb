use anyhow::Context;
use magcore::prelude::{ColumnConfig, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything one estimation run needs, loadable from YAML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub input: Option<PathBuf>,
    /// Annotated CSV destination; the input file is overwritten when absent.
    pub output_file: Option<PathBuf>,
    /// Directory for the targets file; the input's directory when absent.
    pub output_dir: Option<PathBuf>,
    /// Optional JSON dump of the per-group results.
    pub summary: Option<PathBuf>,
    /// Constant background field (nT) used as the reference model.
    pub reference_field_nt: Option<f64>,
    pub columns: ColumnConfig,
    pub pipeline: PipelineConfig,
}

/// Command-line values that take precedence over the YAML file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub reference_field_nt: Option<f64>,
    pub mag_column: Option<String>,
    pub altitude_amsl_column: Option<String>,
    pub altitude_agl_column: Option<String>,
    pub cell_size: Option<f64>,
    pub blanking_distance: Option<f64>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.input.is_some() {
            self.input = overrides.input;
        }
        if overrides.output_file.is_some() {
            self.output_file = overrides.output_file;
        }
        if overrides.output_dir.is_some() {
            self.output_dir = overrides.output_dir;
        }
        if overrides.summary.is_some() {
            self.summary = overrides.summary;
        }
        if overrides.reference_field_nt.is_some() {
            self.reference_field_nt = overrides.reference_field_nt;
        }
        if let Some(column) = overrides.mag_column {
            self.columns.field = column;
        }
        // An empty name switches the optional altitude columns off.
        if let Some(column) = overrides.altitude_amsl_column {
            self.columns.altitude_amsl = Some(column).filter(|name| !name.trim().is_empty());
        }
        if let Some(column) = overrides.altitude_agl_column {
            self.columns.altitude_agl = Some(column).filter(|name| !name.trim().is_empty());
        }
        if overrides.cell_size.is_some() {
            self.pipeline.cell_size_m = overrides.cell_size;
        }
        if overrides.blanking_distance.is_some() {
            self.pipeline.blanking_distance_m = overrides.blanking_distance;
        }
        self
    }

    /// `<stem>-targets-as.csv` in the output directory.
    pub fn targets_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|stem| normalize_stem(&stem.to_string_lossy()))
            .unwrap_or_else(|| "survey".to_string());
        let dir = match &self.output_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        dir.join(format!("{}-targets-as.csv", stem))
    }
}

/// Strips an export timestamp tail from a file stem: a separator followed by
/// ten or more digits, the same digits in parentheses, or a bare run of
/// twelve or more digits.
pub fn normalize_stem(stem: &str) -> String {
    let s = stem.trim();
    let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let head = &s[..s.len() - digits];

    if digits >= 10 {
        if let Some(sep) = head.chars().last() {
            if matches!(sep, '_' | '-' | '.') || sep.is_whitespace() {
                return head[..head.len() - sep.len_utf8()].to_string();
            }
        }
    }

    if let Some(inner) = s.strip_suffix(')') {
        let inner_digits = inner.len() - inner.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let before = &inner[..inner.len() - inner_digits];
        if inner_digits >= 10 {
            if let Some(prefix) = before.strip_suffix('(') {
                return prefix.trim_end().to_string();
            }
        }
    }

    if digits >= 12 {
        return head.to_string();
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        let yaml = "input: survey.csv\n\
                    columns:\n  field: Mag\n\
                    pipeline:\n  cell_size_m: 0.5\n  k_factor: 0.7\n";
        temp.write_all(yaml.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.input, Some(PathBuf::from("survey.csv")));
        assert_eq!(cfg.columns.field, "Mag");
        assert_eq!(cfg.columns.latitude, "Latitude");
        assert_eq!(cfg.pipeline.cell_size_m, Some(0.5));
        assert_eq!(cfg.pipeline.k_factor, 0.7);
        assert_eq!(cfg.pipeline.min_window_samples, 20);
    }

    #[test]
    fn overrides_take_precedence() {
        let cfg = WorkflowConfig::default().with_overrides(Overrides {
            mag_column: Some("B".into()),
            altitude_agl_column: Some("".into()),
            altitude_amsl_column: Some("Alt MSL".into()),
            cell_size: Some(0.25),
            ..Default::default()
        });
        assert_eq!(cfg.columns.field, "B");
        assert_eq!(cfg.columns.altitude_agl, None);
        assert_eq!(cfg.columns.altitude_amsl.as_deref(), Some("Alt MSL"));
        assert_eq!(cfg.pipeline.cell_size_m, Some(0.25));
        assert_eq!(cfg.pipeline.blanking_distance_m, None);
    }

    #[test]
    fn targets_path_defaults_to_input_directory() {
        let cfg = WorkflowConfig::default();
        let path = cfg.targets_path(Path::new("/data/site_a_1715590000123.csv"));
        assert_eq!(path, PathBuf::from("/data/site_a-targets-as.csv"));

        let cfg = WorkflowConfig {
            output_dir: Some(PathBuf::from("/out")),
            ..Default::default()
        };
        assert_eq!(
            cfg.targets_path(Path::new("/data/field.csv")),
            PathBuf::from("/out/field-targets-as.csv")
        );
    }

    #[test]
    fn stem_normalization_strips_export_stamps() {
        assert_eq!(normalize_stem("line-1234567890"), "line");
        assert_eq!(normalize_stem("survey (1715590000)"), "survey");
        assert_eq!(normalize_stem("mag171559000012"), "mag");
        assert_eq!(normalize_stem("grid_2024"), "grid_2024");
        assert_eq!(normalize_stem("  plain  "), "plain");
    }
}
