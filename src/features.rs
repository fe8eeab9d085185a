//! Cohort-relative feature normalization
//!
//! Two phases: `CohortNorms::compute` materializes percentile cut-offs and
//! min-max ranges once over the full active cohort, then `normalize_user`
//! is a pure per-user transform taking that norms object as explicit input.
//! All segments share the same percentile basis per feature.

use chrono::NaiveDate;

use crate::profile::UserProfile;

/// Inclusive working-age boundaries for the business-traveler gate.
const WORKING_AGE_MIN: i64 = 25;
const WORKING_AGE_MAX: i64 = 60;

/// Strict upper age bound for the young-customer flag.
const YOUNG_AGE_CUTOFF: i64 = 30;

/// Cohort statistics for one profile field: percentile cut-offs plus the
/// observed range used for min-max rescaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStats {
    pub p_low: f64,
    pub p_high: f64,
    pub min: f64,
    pub max: f64,
}

impl FeatureStats {
    fn from_values(values: &[f64], lower_pct: f64, upper_pct: f64) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        FeatureStats {
            p_low: percentile(&sorted, lower_pct),
            p_high: percentile(&sorted, upper_pct),
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
        }
    }

    /// Linear min-max rescale into [0, 1]. A degenerate cohort range (all
    /// users share the value) maps every user to the neutral 0.5.
    pub fn norm(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            0.5
        } else {
            ((value - self.min) / range).clamp(0.0, 1.0)
        }
    }

    /// Strictly below the lower percentile cut-off.
    pub fn below_low(&self, value: f64) -> bool {
        value < self.p_low
    }

    /// Strictly above the upper percentile cut-off.
    pub fn above_high(&self, value: f64) -> bool {
        value > self.p_high
    }
}

/// Percentile with continuous linear interpolation over a sorted slice.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let weight = rank - lo as f64;
        sorted[lo] * (1.0 - weight) + sorted[hi] * weight
    }
}

/// Immutable cohort-wide statistics, computed exactly once per run. This is
/// the one synchronization barrier of the pipeline: every profile must be
/// materialized before any flag or score can be derived.
#[derive(Debug, Clone)]
pub struct CohortNorms {
    pub booking_lead: FeatureStats,
    pub clicks: FeatureStats,
    pub cost_per_km: FeatureStats,
    pub cost_per_night: FeatureStats,
    pub session_count: FeatureStats,
    pub booking_count: FeatureStats,
    pub seats: FeatureStats,
    pub bags: FeatureStats,
}

impl CohortNorms {
    pub fn compute(profiles: &[UserProfile], lower_pct: f64, upper_pct: f64) -> Self {
        let stats = |extract: fn(&UserProfile) -> f64| {
            let values: Vec<f64> = profiles.iter().map(extract).collect();
            FeatureStats::from_values(&values, lower_pct, upper_pct)
        };

        CohortNorms {
            booking_lead: stats(|p| p.avg_booking_lead_minutes),
            clicks: stats(|p| p.avg_clicks_per_session),
            cost_per_km: stats(|p| p.avg_cost_per_km),
            cost_per_night: stats(|p| p.avg_cost_per_night),
            session_count: stats(|p| p.session_count as f64),
            booking_count: stats(|p| p.booking_count as f64),
            seats: stats(|p| p.avg_seats_per_booking),
            bags: stats(|p| p.avg_bags_per_booking),
        }
    }
}

/// UserProfile lifted into cohort-relative space: percentile flags, bounded
/// [0, 1] features with inverted variants, and fixed demographic flags.
#[derive(Debug, Clone)]
pub struct NormalizedFeatures {
    pub user_id: i64,

    pub is_quick_booker_p20: bool,
    pub is_frequent_clicker_p80: bool,
    pub is_low_cost_km_p20: bool,
    pub is_high_cost_km_p80: bool,
    pub is_low_cost_night_p20: bool,
    pub is_high_cost_night_p80: bool,

    pub session_count_norm: f64,
    pub session_count_norm_invert: f64,
    pub booking_count_norm: f64,
    pub avg_seats_norm: f64,
    pub avg_seats_norm_invert: f64,
    pub avg_bags_norm: f64,
    pub avg_bags_norm_invert: f64,
    pub cost_per_km_norm: f64,
    pub cost_per_km_norm_invert: f64,
    pub cost_per_night_norm: f64,
    pub cost_per_night_norm_invert: f64,
    pub clicks_norm: f64,
    pub booking_lead_norm_invert: f64,

    pub discount_rate: f64,
    pub weekday_travel_share: f64,
    pub weekend_travel_share: f64,

    pub is_in_working_age: bool,
    pub is_young_customer: bool,
    pub is_new_customer: bool,
    /// Only browses and cancels, never completes a booking.
    pub is_dreamer: bool,
}

/// Pure per-user transform from profile to normalized features, relative to
/// the fixed cohort norms.
pub fn normalize_user(
    profile: &UserProfile,
    norms: &CohortNorms,
    cohort_start: NaiveDate,
) -> NormalizedFeatures {
    let seats_norm = norms.seats.norm(profile.avg_seats_per_booking);
    let bags_norm = norms.bags.norm(profile.avg_bags_per_booking);
    let cost_km_norm = norms.cost_per_km.norm(profile.avg_cost_per_km);
    let cost_night_norm = norms.cost_per_night.norm(profile.avg_cost_per_night);
    let session_norm = norms.session_count.norm(profile.session_count as f64);

    NormalizedFeatures {
        user_id: profile.user_id,

        is_quick_booker_p20: norms.booking_lead.below_low(profile.avg_booking_lead_minutes),
        is_frequent_clicker_p80: norms.clicks.above_high(profile.avg_clicks_per_session),
        is_low_cost_km_p20: norms.cost_per_km.below_low(profile.avg_cost_per_km),
        is_high_cost_km_p80: norms.cost_per_km.above_high(profile.avg_cost_per_km),
        is_low_cost_night_p20: norms.cost_per_night.below_low(profile.avg_cost_per_night),
        is_high_cost_night_p80: norms.cost_per_night.above_high(profile.avg_cost_per_night),

        session_count_norm: session_norm,
        session_count_norm_invert: 1.0 - session_norm,
        booking_count_norm: norms.booking_count.norm(profile.booking_count as f64),
        avg_seats_norm: seats_norm,
        avg_seats_norm_invert: 1.0 - seats_norm,
        avg_bags_norm: bags_norm,
        avg_bags_norm_invert: 1.0 - bags_norm,
        cost_per_km_norm: cost_km_norm,
        cost_per_km_norm_invert: 1.0 - cost_km_norm,
        cost_per_night_norm: cost_night_norm,
        cost_per_night_norm_invert: 1.0 - cost_night_norm,
        clicks_norm: norms.clicks.norm(profile.avg_clicks_per_session),
        booking_lead_norm_invert: 1.0 - norms.booking_lead.norm(profile.avg_booking_lead_minutes),

        discount_rate: profile.discount_usage_rate,
        weekday_travel_share: profile.weekday_travel_share,
        weekend_travel_share: 1.0 - profile.weekday_travel_share,

        is_in_working_age: (WORKING_AGE_MIN..=WORKING_AGE_MAX).contains(&profile.age),
        is_young_customer: profile.age < YOUNG_AGE_CUTOFF,
        is_new_customer: profile.signup_date >= cohort_start,
        is_dreamer: profile.booking_count == 0 && profile.cancellation_count > 0,
    }
}

/// All-zero feature vector for scorer and assigner tests.
#[cfg(test)]
pub(crate) fn zeroed(user_id: i64) -> NormalizedFeatures {
    NormalizedFeatures {
        user_id,
        is_quick_booker_p20: false,
        is_frequent_clicker_p80: false,
        is_low_cost_km_p20: false,
        is_high_cost_km_p80: false,
        is_low_cost_night_p20: false,
        is_high_cost_night_p80: false,
        session_count_norm: 0.0,
        session_count_norm_invert: 0.0,
        booking_count_norm: 0.0,
        avg_seats_norm: 0.0,
        avg_seats_norm_invert: 0.0,
        avg_bags_norm: 0.0,
        avg_bags_norm_invert: 0.0,
        cost_per_km_norm: 0.0,
        cost_per_km_norm_invert: 0.0,
        cost_per_night_norm: 0.0,
        cost_per_night_norm_invert: 0.0,
        clicks_norm: 0.0,
        booking_lead_norm_invert: 0.0,
        discount_rate: 0.0,
        weekday_travel_share: 0.0,
        weekend_travel_share: 0.0,
        is_in_working_age: false,
        is_young_customer: false,
        is_new_customer: false,
        is_dreamer: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::AgeBracket;

    fn profile(user_id: i64) -> UserProfile {
        UserProfile {
            user_id,
            session_count: 10,
            booking_count: 3,
            cancellation_count: 0,
            discount_usage_rate: 0.2,
            avg_minutes_per_session: 12.0,
            avg_clicks_per_session: 20.0,
            avg_booking_lead_minutes: 500.0,
            avg_cost_per_km: 0.4,
            avg_cost_per_night: 120.0,
            avg_seats_per_booking: 1.0,
            avg_bags_per_booking: 0.5,
            weekday_travel_share: 0.6,
            age: 35,
            age_bracket: AgeBracket::From25To39,
            signup_date: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
        }
    }

    fn cohort_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 4).unwrap()
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert!((percentile(&sorted, 0.0) - 10.0).abs() < 1e-9);
        assert!((percentile(&sorted, 50.0) - 30.0).abs() < 1e-9);
        assert!((percentile(&sorted, 100.0) - 50.0).abs() < 1e-9);
        // 20th percentile of 5 values: rank 0.8, between 10 and 20.
        assert!((percentile(&sorted, 20.0) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_stability() {
        let mut profiles = Vec::new();
        for i in 0..25 {
            let mut p = profile(i);
            p.avg_clicks_per_session = (i * 3) as f64;
            p.avg_cost_per_km = 0.1 + i as f64 * 0.05;
            profiles.push(p);
        }

        let a = CohortNorms::compute(&profiles, 20.0, 80.0);
        let b = CohortNorms::compute(&profiles, 20.0, 80.0);
        assert_eq!(a.clicks, b.clicks);
        assert_eq!(a.cost_per_km, b.cost_per_km);
    }

    #[test]
    fn test_degenerate_range_maps_to_neutral() {
        let stats = FeatureStats::from_values(&[7.0, 7.0, 7.0], 20.0, 80.0);
        assert_eq!(stats.norm(7.0), 0.5);
        assert_eq!(stats.norm(100.0), 0.5);
    }

    #[test]
    fn test_percentile_flags_are_strict() {
        let values: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let stats = FeatureStats::from_values(&values, 20.0, 80.0);
        // p20 of 0..=10 is 2.0, p80 is 8.0.
        assert!(!stats.below_low(2.0));
        assert!(stats.below_low(1.9));
        assert!(!stats.above_high(8.0));
        assert!(stats.above_high(8.1));
    }

    #[test]
    fn test_normalized_features_are_bounded() {
        let mut profiles = Vec::new();
        for i in 0..10 {
            let mut p = profile(i);
            p.avg_clicks_per_session = (i * 10) as f64;
            p.session_count = 8 + i as u32;
            p.booking_count = i as u32;
            profiles.push(p);
        }
        let norms = CohortNorms::compute(&profiles, 20.0, 80.0);

        for p in &profiles {
            let f = normalize_user(p, &norms, cohort_start());
            for value in [
                f.session_count_norm,
                f.session_count_norm_invert,
                f.booking_count_norm,
                f.avg_seats_norm,
                f.avg_seats_norm_invert,
                f.avg_bags_norm,
                f.avg_bags_norm_invert,
                f.cost_per_km_norm,
                f.cost_per_km_norm_invert,
                f.cost_per_night_norm,
                f.cost_per_night_norm_invert,
                f.clicks_norm,
                f.booking_lead_norm_invert,
                f.discount_rate,
                f.weekday_travel_share,
                f.weekend_travel_share,
            ] {
                assert!((0.0..=1.0).contains(&value), "{value} out of [0, 1]");
            }
        }
    }

    #[test]
    fn test_demographic_flags_use_fixed_boundaries() {
        let norms = CohortNorms::compute(&[profile(1)], 20.0, 80.0);

        let mut young = profile(1);
        young.age = 24;
        let f = normalize_user(&young, &norms, cohort_start());
        assert!(f.is_young_customer);
        assert!(!f.is_in_working_age);

        let mut working = profile(2);
        working.age = 45;
        let f = normalize_user(&working, &norms, cohort_start());
        assert!(!f.is_young_customer);
        assert!(f.is_in_working_age);
    }

    #[test]
    fn test_dreamer_precondition() {
        let norms = CohortNorms::compute(&[profile(1)], 20.0, 80.0);

        let mut dreamer = profile(1);
        dreamer.booking_count = 0;
        dreamer.cancellation_count = 2;
        assert!(normalize_user(&dreamer, &norms, cohort_start()).is_dreamer);

        let mut booker = profile(2);
        booker.booking_count = 1;
        booker.cancellation_count = 2;
        assert!(!normalize_user(&booker, &norms, cohort_start()).is_dreamer);
    }

    #[test]
    fn test_new_customer_flag() {
        let norms = CohortNorms::compute(&[profile(1)], 20.0, 80.0);

        let mut new = profile(1);
        new.signup_date = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        assert!(normalize_user(&new, &norms, cohort_start()).is_new_customer);

        let old = profile(2);
        assert!(!normalize_user(&old, &norms, cohort_start()).is_new_customer);
    }
}
