//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::config::PipelineConfig;

/// Customer segmentation CLI: scores behavioral session data into named
/// segments with recommended loyalty perks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input session CSV file
    #[arg(short, long, default_value = "sessions.csv")]
    pub input: String,

    /// Optional JSON pipeline configuration; defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output path for the per-user assignment CSV
    #[arg(short, long, default_value = "assignments.csv")]
    pub output: String,

    /// Optional output path for the segment summary CSV
    #[arg(long)]
    pub summary_output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Load the pipeline configuration named by `--config`, or defaults.
    pub fn resolve_config(&self) -> crate::Result<PipelineConfig> {
        match &self.config {
            Some(path) => PipelineConfig::from_json_file(path),
            None => Ok(PipelineConfig::default()),
        }
    }
}
