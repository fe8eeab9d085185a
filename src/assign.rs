//! Segment assignment, perk mapping, and cohort summary

use std::collections::BTreeMap;

use crate::segments::{UserScores, OTHERS_LABEL};

/// Final per-user outcome of a pipeline run. Immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub user_id: i64,
    pub final_segment: String,
    pub assigned_perk: String,
    /// Winning score before the fallback override, kept for diagnostics.
    pub top_score: f64,
}

/// Per-segment aggregate over the Assignment table.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub segment: String,
    pub user_count: usize,
    /// Share of the cohort, rounded to 2 decimal places.
    pub cohort_share: f64,
    pub perk: String,
}

/// Perk label for unmapped segment names, including "Others".
const DEFAULT_PERK: &str = "Baseline Discount - TBD";

/// Static segment-to-perk lookup for loyalty-program hypothesis generation.
pub fn perk_for(segment: &str) -> &'static str {
    match segment {
        "Budget" => "Exclusive Discounts",
        "Business" => "Free Checked Bag",
        "Deal Hunter" => "Early Access To Flash Sales",
        "Dreamer" => "No Cancellation Fees",
        "Family" => "Free Hotel Meal",
        "Frequent Traveler" => "1 Night Free Hotel With Flight",
        "New" => "Welcome Voucher",
        "Premium" => "Priority Boarding & Lounge Access",
        "Young" => "Student Discount",
        _ => DEFAULT_PERK,
    }
}

/// Pick the final segment for one user: argmax over the scores, ties broken
/// by alphabetical segment name, falling back to "Others" when the maximum
/// is strictly below the threshold.
///
/// Relies on `scores` arriving in registry (alphabetical) order: scanning
/// with a strict `>` keeps the first, alphabetically smallest, winner.
pub fn assign_user(scores: &UserScores, others_threshold: f64) -> Assignment {
    let mut best_name = OTHERS_LABEL;
    let mut best_score = f64::NEG_INFINITY;
    for (segment, score) in &scores.scores {
        if *score > best_score {
            best_score = *score;
            best_name = segment.name();
        }
    }

    let final_segment = if best_score < others_threshold {
        OTHERS_LABEL
    } else {
        best_name
    };

    Assignment {
        user_id: scores.user_id,
        final_segment: final_segment.to_string(),
        assigned_perk: perk_for(final_segment).to_string(),
        top_score: best_score,
    }
}

pub fn assign_cohort(scored: &[UserScores], others_threshold: f64) -> Vec<Assignment> {
    scored
        .iter()
        .map(|scores| assign_user(scores, others_threshold))
        .collect()
}

/// Aggregate assignments by final segment, ordered by descending user count
/// (name ascending on ties, for deterministic output).
pub fn summarize(assignments: &[Assignment]) -> Vec<SegmentSummary> {
    let total = assignments.len();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for assignment in assignments {
        *counts.entry(assignment.final_segment.as_str()).or_insert(0) += 1;
    }

    let mut summary: Vec<SegmentSummary> = counts
        .into_iter()
        .map(|(segment, user_count)| SegmentSummary {
            segment: segment.to_string(),
            user_count,
            cohort_share: round2(user_count as f64 / total as f64),
            perk: perk_for(segment).to_string(),
        })
        .collect();

    summary.sort_by(|a, b| {
        b.user_count
            .cmp(&a.user_count)
            .then_with(|| a.segment.cmp(&b.segment))
    });
    summary
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
