//! Pipeline orchestration
//!
//! Runs the full stage sequence over raw sessions: cohort filter, cleaning,
//! aggregation, normalization, scoring, assignment, summary. Pure and
//! deterministic: identical input and configuration reproduce identical
//! output.

use log::{debug, info};

use crate::assign::{assign_cohort, summarize, Assignment, SegmentSummary};
use crate::clean::clean_sessions;
use crate::config::PipelineConfig;
use crate::data::{filter_active_cohort, RawSession};
use crate::error::PipelineError;
use crate::features::{normalize_user, CohortNorms};
use crate::profile::aggregate_users;
use crate::segments::{registry_with_overrides, score_cohort};

/// Output of one segmentation run.
#[derive(Debug)]
pub struct SegmentationResult {
    /// One row per active-cohort user.
    pub assignments: Vec<Assignment>,
    /// Per-segment aggregates, ordered by descending user count.
    pub summary: Vec<SegmentSummary>,
    pub cohort_size: usize,
    /// Sessions dropped by the cleaner as structurally unrecoverable.
    pub excluded_sessions: usize,
}

/// Run the segmentation pipeline over raw sessions.
///
/// Configuration is validated first, so no data is touched on a bad config.
pub fn run_segmentation(
    sessions: &[RawSession],
    config: &PipelineConfig,
) -> Result<SegmentationResult, PipelineError> {
    config.validate()?;

    let cohort_sessions =
        filter_active_cohort(sessions, config.cohort_start, config.min_sessions);
    info!(
        "cohort filter kept {} of {} sessions",
        cohort_sessions.len(),
        sessions.len()
    );
    if cohort_sessions.is_empty() {
        return Err(PipelineError::EmptyCohort {
            cohort_start: config.cohort_start,
            min_sessions: config.min_sessions,
        });
    }

    let (cleaned, excluded_sessions) = clean_sessions(cohort_sessions);
    debug!("cleaner excluded {excluded_sessions} unrecoverable sessions");

    let profiles = aggregate_users(&cleaned);
    if profiles.is_empty() {
        return Err(PipelineError::EmptyCohort {
            cohort_start: config.cohort_start,
            min_sessions: config.min_sessions,
        });
    }
    info!("aggregated {} user profiles", profiles.len());

    // Cohort-wide barrier: norms are fixed here, before any per-user flag
    // or score is derived.
    let norms = CohortNorms::compute(&profiles, config.lower_percentile, config.upper_percentile);

    let features: Vec<_> = profiles
        .iter()
        .map(|profile| normalize_user(profile, &norms, config.cohort_start))
        .collect();

    let defs = registry_with_overrides(&config.weight_overrides);
    let scored = score_cohort(&features, &defs);

    let assignments = assign_cohort(&scored, config.others_threshold);
    let summary = summarize(&assignments);
    info!(
        "assigned {} users across {} segments",
        assignments.len(),
        summary.len()
    );

    Ok(SegmentationResult {
        cohort_size: assignments.len(),
        assignments,
        summary,
        excluded_sessions,
    })
}
