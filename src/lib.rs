//! SegForge: deterministic customer segmentation from behavioral session data
//!
//! This library turns raw per-session travel records into one segment
//! assignment per customer plus a recommended loyalty perk. The pipeline is a
//! pure batch computation: cohort filter, session cleaning, per-user
//! aggregation, cohort-relative feature normalization, weighted segment
//! scoring, and assignment with a deterministic tie-break.

pub mod assign;
pub mod clean;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod profile;
pub mod segments;

// Re-export public items for easier access
pub use assign::{Assignment, SegmentSummary};
pub use cli::Args;
pub use config::PipelineConfig;
pub use data::{load_sessions, RawSession};
pub use error::PipelineError;
pub use pipeline::{run_segmentation, SegmentationResult};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
