use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use magcore::processing::{PipelineOutput, RunSummary, SurveyPipeline};
use magcore::survey::{EstimationResult, SurveyTable};
use magcore::ConstantField;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Files written by a run and the headline counts.
#[derive(Debug, Default)]
pub struct WorkflowResult {
    pub annotated: Option<PathBuf>,
    pub targets: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub groups: usize,
    pub warnings: usize,
    pub target_rows: usize,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    run: &'a RunSummary,
    groups: &'a [EstimationResult],
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Loads the survey, runs the pipeline and writes every output.
    /// Nothing is written unless the whole run succeeds.
    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let input = self
            .config
            .input
            .as_deref()
            .context("no input survey given")?;
        let table = SurveyTable::load(input)
            .with_context(|| format!("reading survey {}", input.display()))?;
        log::info!("Loaded {} row(s) from {}", table.len(), input.display());

        let mut pipeline =
            SurveyPipeline::new(self.config.pipeline.clone(), self.config.columns.clone());
        if let Some(intensity) = self.config.reference_field_nt {
            pipeline = pipeline.with_reference(Box::new(ConstantField(intensity)));
        }

        let Some(output) = pipeline.run(&table).context("running depth estimation")? else {
            return Ok(WorkflowResult::default());
        };

        let mut annotated = Vec::new();
        table
            .write_annotated(&mut annotated, &output.annotations)
            .context("formatting annotated survey")?;
        let mut targets = Vec::new();
        let target_rows = table
            .write_targets(&mut targets, &output.marks, &output.annotations)
            .context("formatting targets")?;
        let summary = match &self.config.summary {
            Some(path) => Some((path.clone(), summary_json(&output)?)),
            None => None,
        };

        let annotated_path = self
            .config
            .output_file
            .clone()
            .unwrap_or_else(|| input.to_path_buf());
        let targets_path = self.config.targets_path(input);

        write_file(&annotated_path, &annotated)?;
        log::info!("Writing result to {}", annotated_path.display());
        write_file(&targets_path, &targets)?;
        log::info!("Writing targets to {}", targets_path.display());
        if let Some((path, json)) = &summary {
            write_file(path, json.as_bytes())?;
        }

        Ok(WorkflowResult {
            annotated: Some(annotated_path),
            targets: Some(targets_path),
            summary: summary.map(|(path, _)| path),
            groups: output.results.len(),
            warnings: output.summary.metrics.warnings,
            target_rows,
        })
    }
}

fn summary_json(output: &PipelineOutput) -> anyhow::Result<String> {
    let document = SummaryDocument {
        run: &output.summary,
        groups: &output.results,
    };
    serde_json::to_string_pretty(&document).context("serializing run summary")
}

fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{write_survey_file, GeneratorConfig};
    use tempfile::tempdir;

    #[test]
    fn runner_writes_annotated_targets_and_summary() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("site_1715590000.csv");
        write_survey_file(&input, &GeneratorConfig::default()).unwrap();

        let config = WorkflowConfig {
            input: Some(input.clone()),
            output_dir: Some(dir.path().join("out")),
            summary: Some(dir.path().join("summary.json")),
            reference_field_nt: Some(49_500.0),
            ..Default::default()
        };
        let result = Runner::new(config).execute().unwrap();
        assert_eq!(result.groups, 1);
        assert_eq!(result.target_rows, 5);

        let targets = result.targets.unwrap();
        assert_eq!(targets, dir.path().join("out").join("site-targets-as.csv"));
        let text = fs::read_to_string(&targets).unwrap();
        assert_eq!(text.lines().count(), 6);

        let annotated = fs::read_to_string(&input).unwrap();
        let header = annotated.lines().next().unwrap();
        assert!(header.ends_with("Estimated_Depth,Quality_Flag,Quality_Notes"));

        let summary_text = fs::read_to_string(dir.path().join("summary.json")).unwrap();
        let summary: serde_json::Value = serde_json::from_str(&summary_text).unwrap();
        assert_eq!(summary["groups"].as_array().unwrap().len(), 1);
        assert_eq!(summary["run"]["marked_rows"], 5);
    }

    #[test]
    fn unmarked_survey_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("quiet.csv");
        let generator = GeneratorConfig {
            mark_radius_m: 0.0,
            sources: Vec::new(),
            ..Default::default()
        };
        write_survey_file(&input, &generator).unwrap();
        let before = fs::read_to_string(&input).unwrap();

        let config = WorkflowConfig {
            input: Some(input.clone()),
            ..Default::default()
        };
        let result = Runner::new(config).execute().unwrap();
        assert!(result.annotated.is_none());
        assert_eq!(fs::read_to_string(&input).unwrap(), before);
        assert!(!dir.path().join("quiet-targets-as.csv").exists());
    }

    #[test]
    fn missing_column_aborts_without_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.csv");
        fs::write(&input, "Latitude,Longitude,Mark\n52,13,1\n").unwrap();

        let config = WorkflowConfig {
            input: Some(input.clone()),
            ..Default::default()
        };
        let err = Runner::new(config).execute().unwrap_err();
        assert!(format!("{:#}", err).contains("missing required column: TMI"));
        assert_eq!(fs::read_to_string(&input).unwrap(), "Latitude,Longitude,Mark\n52,13,1\n");
    }
}
