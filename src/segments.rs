//! Segment definitions and weighted scoring
//!
//! Each segment is one entry in a registry: a name, an optional hard gate,
//! and a weighted feature list summing to 1.0. Scoring iterates the registry
//! uniformly, so adding a segment never touches shared plumbing. The
//! registry is kept in alphabetical name order, which the assigner relies on
//! for its tie-break.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::NormalizedFeatures;

/// The nine substantive customer segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    Budget,
    Business,
    DealHunter,
    Dreamer,
    Family,
    FrequentTraveler,
    New,
    Premium,
    Young,
}

impl Segment {
    pub fn name(self) -> &'static str {
        match self {
            Segment::Budget => "Budget",
            Segment::Business => "Business",
            Segment::DealHunter => "Deal Hunter",
            Segment::Dreamer => "Dreamer",
            Segment::Family => "Family",
            Segment::FrequentTraveler => "Frequent Traveler",
            Segment::New => "New",
            Segment::Premium => "Premium",
            Segment::Young => "Young",
        }
    }
}

/// Fallback category for users below the assignment threshold.
pub const OTHERS_LABEL: &str = "Others";

/// Scoreable feature identifiers. Flags evaluate to 0.0/1.0, so every
/// feature value lies in [0, 1] and weighted sums stay bounded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    IsQuickBookerP20,
    IsFrequentClickerP80,
    IsLowCostKmP20,
    IsHighCostKmP80,
    IsLowCostNightP20,
    IsHighCostNightP80,
    SessionCountNorm,
    SessionCountNormInvert,
    BookingCountNorm,
    AvgSeatsNorm,
    AvgSeatsNormInvert,
    AvgBagsNorm,
    AvgBagsNormInvert,
    CostPerKmNorm,
    CostPerKmNormInvert,
    CostPerNightNorm,
    CostPerNightNormInvert,
    ClicksNorm,
    BookingLeadNormInvert,
    DiscountRate,
    WeekdayTravelShare,
    WeekendTravelShare,
    IsInWorkingAge,
    IsYoungCustomer,
    IsNewCustomer,
}

impl Feature {
    pub fn value(self, f: &NormalizedFeatures) -> f64 {
        match self {
            Feature::IsQuickBookerP20 => flag(f.is_quick_booker_p20),
            Feature::IsFrequentClickerP80 => flag(f.is_frequent_clicker_p80),
            Feature::IsLowCostKmP20 => flag(f.is_low_cost_km_p20),
            Feature::IsHighCostKmP80 => flag(f.is_high_cost_km_p80),
            Feature::IsLowCostNightP20 => flag(f.is_low_cost_night_p20),
            Feature::IsHighCostNightP80 => flag(f.is_high_cost_night_p80),
            Feature::SessionCountNorm => f.session_count_norm,
            Feature::SessionCountNormInvert => f.session_count_norm_invert,
            Feature::BookingCountNorm => f.booking_count_norm,
            Feature::AvgSeatsNorm => f.avg_seats_norm,
            Feature::AvgSeatsNormInvert => f.avg_seats_norm_invert,
            Feature::AvgBagsNorm => f.avg_bags_norm,
            Feature::AvgBagsNormInvert => f.avg_bags_norm_invert,
            Feature::CostPerKmNorm => f.cost_per_km_norm,
            Feature::CostPerKmNormInvert => f.cost_per_km_norm_invert,
            Feature::CostPerNightNorm => f.cost_per_night_norm,
            Feature::CostPerNightNormInvert => f.cost_per_night_norm_invert,
            Feature::ClicksNorm => f.clicks_norm,
            Feature::BookingLeadNormInvert => f.booking_lead_norm_invert,
            Feature::DiscountRate => f.discount_rate,
            Feature::WeekdayTravelShare => f.weekday_travel_share,
            Feature::WeekendTravelShare => f.weekend_travel_share,
            Feature::IsInWorkingAge => flag(f.is_in_working_age),
            Feature::IsYoungCustomer => flag(f.is_young_customer),
            Feature::IsNewCustomer => flag(f.is_new_customer),
        }
    }
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

/// One segment's scoring rule: optional hard gate plus a weighted feature
/// sum. A failed gate forces the score to 0 regardless of the weights.
#[derive(Debug, Clone)]
pub struct SegmentDef {
    pub segment: Segment,
    pub gate: Option<fn(&NormalizedFeatures) -> bool>,
    pub weights: Vec<(Feature, f64)>,
}

impl SegmentDef {
    pub fn score(&self, f: &NormalizedFeatures) -> f64 {
        if let Some(gate) = self.gate {
            if !gate(f) {
                return 0.0;
            }
        }
        self.weights
            .iter()
            .map(|(feature, weight)| weight * feature.value(f))
            .sum()
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }
}

fn business_gate(f: &NormalizedFeatures) -> bool {
    f.is_in_working_age && f.weekday_travel_share >= 0.5
}

fn dreamer_gate(f: &NormalizedFeatures) -> bool {
    f.is_dreamer
}

fn new_gate(f: &NormalizedFeatures) -> bool {
    f.is_new_customer
}

fn young_gate(f: &NormalizedFeatures) -> bool {
    f.is_young_customer
}

/// The default registry, in alphabetical name order.
pub fn registry() -> Vec<SegmentDef> {
    vec![
        SegmentDef {
            segment: Segment::Budget,
            gate: None,
            weights: vec![
                (Feature::IsLowCostKmP20, 0.25),
                (Feature::IsLowCostNightP20, 0.25),
                (Feature::CostPerKmNormInvert, 0.25),
                (Feature::CostPerNightNormInvert, 0.25),
            ],
        },
        SegmentDef {
            segment: Segment::Business,
            gate: Some(business_gate),
            weights: vec![
                (Feature::WeekdayTravelShare, 0.4),
                (Feature::AvgBagsNormInvert, 0.3),
                (Feature::AvgSeatsNormInvert, 0.3),
            ],
        },
        SegmentDef {
            segment: Segment::DealHunter,
            gate: None,
            weights: vec![
                (Feature::DiscountRate, 0.5),
                (Feature::ClicksNorm, 0.3),
                (Feature::IsFrequentClickerP80, 0.2),
            ],
        },
        SegmentDef {
            segment: Segment::Dreamer,
            gate: Some(dreamer_gate),
            weights: vec![
                (Feature::ClicksNorm, 0.4),
                (Feature::SessionCountNorm, 0.3),
                (Feature::DiscountRate, 0.3),
            ],
        },
        SegmentDef {
            segment: Segment::Family,
            gate: None,
            weights: vec![
                (Feature::AvgSeatsNorm, 0.4),
                (Feature::AvgBagsNorm, 0.3),
                (Feature::WeekendTravelShare, 0.3),
            ],
        },
        SegmentDef {
            segment: Segment::FrequentTraveler,
            gate: None,
            weights: vec![
                (Feature::BookingCountNorm, 0.5),
                (Feature::SessionCountNorm, 0.3),
                (Feature::IsQuickBookerP20, 0.2),
            ],
        },
        SegmentDef {
            segment: Segment::New,
            gate: Some(new_gate),
            weights: vec![
                (Feature::IsNewCustomer, 0.4),
                (Feature::SessionCountNormInvert, 0.3),
                (Feature::ClicksNorm, 0.3),
            ],
        },
        SegmentDef {
            segment: Segment::Premium,
            gate: None,
            weights: vec![
                (Feature::IsHighCostKmP80, 0.25),
                (Feature::IsHighCostNightP80, 0.25),
                (Feature::CostPerKmNorm, 0.25),
                (Feature::CostPerNightNorm, 0.25),
            ],
        },
        SegmentDef {
            segment: Segment::Young,
            gate: Some(young_gate),
            weights: vec![
                (Feature::IsYoungCustomer, 0.4),
                (Feature::ClicksNorm, 0.3),
                (Feature::DiscountRate, 0.3),
            ],
        },
    ]
}

/// Registry with per-segment weight overrides applied. An override replaces
/// the whole weight list for that segment; gates are not configurable.
pub fn registry_with_overrides(
    overrides: &BTreeMap<String, BTreeMap<Feature, f64>>,
) -> Vec<SegmentDef> {
    let mut defs = registry();
    for def in &mut defs {
        if let Some(weights) = overrides.get(def.segment.name()) {
            def.weights = weights.iter().map(|(f, w)| (*f, *w)).collect();
        }
    }
    defs
}

/// Scores for one user, in registry (alphabetical) order.
#[derive(Debug, Clone)]
pub struct UserScores {
    pub user_id: i64,
    pub scores: Vec<(Segment, f64)>,
}

/// Evaluate every registry entry for every user. Exactly one score per
/// (user, segment) pair; gated-out scores are 0.0, never missing.
pub fn score_cohort(features: &[NormalizedFeatures], defs: &[SegmentDef]) -> Vec<UserScores> {
    features
        .iter()
        .map(|f| UserScores {
            user_id: f.user_id,
            scores: defs.iter().map(|def| (def.segment, def.score(f))).collect(),
        })
        .collect()
}
