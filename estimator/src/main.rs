use anyhow::Context;
use clap::Parser;
use generator::profile::{write_survey_file, GeneratorConfig};
use std::path::PathBuf;
use workflow::config::{Overrides, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Single-sensor magnetometer depth estimation")]
struct Args {
    /// Survey CSV; annotated in place unless --output-file is given
    input: Option<PathBuf>,
    /// Total-field column name
    #[arg(long)]
    mag_column: Option<String>,
    /// Altitude AMSL column for the reference field
    #[arg(long)]
    altitude_amsl_column: Option<String>,
    /// Altitude AGL column (empty string to disable)
    #[arg(long)]
    altitude_agl_column: Option<String>,
    /// Directory for the targets file
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Grid cell size in metres (default: median point spacing)
    #[arg(long)]
    cell_size: Option<f64>,
    /// Blanking distance in metres (default: 10 x cell size)
    #[arg(long)]
    blanking_distance: Option<f64>,
    /// Constant background field in nT subtracted from the readings
    #[arg(long)]
    reference_field: Option<f64>,
    /// Write per-group results as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Write a synthetic survey to this path and exit
    #[arg(long)]
    generate: Option<PathBuf>,
    /// Noise seed for --generate
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(path) = args.generate {
        let config = GeneratorConfig {
            seed: args.seed,
            ..Default::default()
        };
        let rows = write_survey_file(&path, &config)?;
        println!("Synthetic survey -> {} ({} rows)", path.display(), rows);
        return Ok(());
    }

    let workflow_config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    }
    .with_overrides(Overrides {
        input: args.input,
        output_file: args.output_file,
        output_dir: args.output_dir,
        summary: args.summary,
        reference_field_nt: args.reference_field,
        mag_column: args.mag_column,
        altitude_amsl_column: args.altitude_amsl_column,
        altitude_agl_column: args.altitude_agl_column,
        cell_size: args.cell_size,
        blanking_distance: args.blanking_distance,
    });

    let result = Runner::new(workflow_config)
        .execute()
        .context("depth estimation failed")?;

    match (&result.annotated, &result.targets) {
        (Some(annotated), Some(targets)) => {
            println!(
                "Done. {} anomaly group(s) processed ({} WARNING); {} target row(s).",
                result.groups, result.warnings, result.target_rows
            );
            println!("  annotated: {}", annotated.display());
            println!("  targets:   {}", targets.display());
        }
        _ => println!("Nothing to do."),
    }
    Ok(())
}
