//! Pipeline error taxonomy

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that terminate a segmentation run before or during processing.
///
/// Malformed raw rows and unrecoverable sessions are not errors: they are
/// excluded and counted in the run's result so callers can report them.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The cohort filter produced zero active users, so cohort-wide
    /// percentiles would be undefined.
    #[error(
        "active cohort is empty: no user exceeded {min_sessions} sessions since {cohort_start}"
    )]
    EmptyCohort {
        cohort_start: NaiveDate,
        min_sessions: u32,
    },

    /// Configuration failed validation at pipeline start, before any data
    /// was processed.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl PipelineError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        PipelineError::InvalidConfig {
            reason: reason.into(),
        }
    }
}
