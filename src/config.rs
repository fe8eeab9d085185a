//! Pipeline configuration
//!
//! Every tunable of the pipeline lives here so runs are adjustable without
//! touching the core logic: cohort window, activity threshold, percentile
//! cut-offs, fallback threshold, and per-segment weight overrides.
//! Validation happens at pipeline start, before any data is processed.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::segments::{registry_with_overrides, Feature};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Start of the behavioral window; only sessions on or after this date
    /// count toward cohort membership.
    pub cohort_start: NaiveDate,
    /// Exclusive session-count threshold: a user needs strictly more
    /// qualifying sessions than this to enter the cohort.
    pub min_sessions: u32,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    /// Users whose best segment score is strictly below this are assigned
    /// "Others".
    pub others_threshold: f64,
    /// Optional replacement weight lists, keyed by segment display name.
    pub weight_overrides: BTreeMap<String, BTreeMap<Feature, f64>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            cohort_start: NaiveDate::from_ymd_opt(2023, 1, 4).unwrap(),
            min_sessions: 7,
            lower_percentile: 20.0,
            upper_percentile: 80.0,
            others_threshold: 0.3,
            weight_overrides: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> crate::Result<Self> {
        let file = File::open(path)?;
        let config: PipelineConfig = serde_json::from_reader(file)?;
        Ok(config)
    }

    /// Reject invalid configurations before any data processing.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.others_threshold) {
            return Err(PipelineError::invalid_config(format!(
                "others_threshold {} must lie in [0, 1]",
                self.others_threshold
            )));
        }
        for pct in [self.lower_percentile, self.upper_percentile] {
            if !(0.0 < pct && pct < 100.0) {
                return Err(PipelineError::invalid_config(format!(
                    "percentile cut-off {pct} must lie strictly between 0 and 100"
                )));
            }
        }
        if self.lower_percentile >= self.upper_percentile {
            return Err(PipelineError::invalid_config(format!(
                "lower percentile {} must be below upper percentile {}",
                self.lower_percentile, self.upper_percentile
            )));
        }

        let defs = registry_with_overrides(&self.weight_overrides);
        let known: Vec<&str> = defs.iter().map(|d| d.segment.name()).collect();
        for name in self.weight_overrides.keys() {
            if !known.contains(&name.as_str()) {
                return Err(PipelineError::invalid_config(format!(
                    "weight override for unknown segment \"{name}\""
                )));
            }
        }
        for def in &defs {
            if def.weights.iter().any(|(_, w)| *w < 0.0) {
                return Err(PipelineError::invalid_config(format!(
                    "{} has a negative feature weight",
                    def.segment.name()
                )));
            }
            let sum = def.weight_sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(PipelineError::invalid_config(format!(
                    "{} weights sum to {sum}, expected 1.0",
                    def.segment.name()
                )));
            }
        }
        Ok(())
    }
}
