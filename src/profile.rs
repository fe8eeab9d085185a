//! Per-user aggregation of cleaned sessions
//!
//! Collapses CleanedSession rows into one behavioral profile per user.
//! Every average defines its zero-observation behavior (neutral 0.0), and
//! cost-per-unit metrics are averaged over per-booking ratios rather than
//! recomputed from user-level sums.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::clean::{CleanedSession, TripStatus};

/// Fixed age bucket boundaries applied directly to the age field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBracket {
    Under25,
    From25To39,
    From40To59,
    Senior,
}

impl AgeBracket {
    pub fn from_age(age: i64) -> Self {
        match age {
            a if a < 25 => AgeBracket::Under25,
            a if a < 40 => AgeBracket::From25To39,
            a if a < 60 => AgeBracket::From40To59,
            _ => AgeBracket::Senior,
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgeBracket::Under25 => "<25",
            AgeBracket::From25To39 => "25-39",
            AgeBracket::From40To59 => "40-59",
            AgeBracket::Senior => "60+",
        };
        f.write_str(label)
    }
}

/// One behavioral profile per active-cohort user.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: i64,
    pub session_count: u32,
    pub booking_count: u32,
    pub cancellation_count: u32,
    pub discount_usage_rate: f64,
    pub avg_minutes_per_session: f64,
    pub avg_clicks_per_session: f64,
    pub avg_booking_lead_minutes: f64,
    pub avg_cost_per_km: f64,
    pub avg_cost_per_night: f64,
    pub avg_seats_per_booking: f64,
    pub avg_bags_per_booking: f64,
    /// Share of booked trips whose travel-start date falls Mon-Fri. The
    /// check-in date is authoritative for multi-day trips.
    pub weekday_travel_share: f64,
    pub age: i64,
    pub age_bracket: AgeBracket,
    pub signup_date: NaiveDate,
}

/// Group cleaned sessions by user and compute one profile per group.
/// Output is ordered by user id for deterministic downstream processing.
pub fn aggregate_users(sessions: &[CleanedSession]) -> Vec<UserProfile> {
    let mut by_user: BTreeMap<i64, Vec<&CleanedSession>> = BTreeMap::new();
    for session in sessions {
        by_user.entry(session.raw.user_id).or_default().push(session);
    }

    by_user
        .into_iter()
        .map(|(user_id, sessions)| profile_for(user_id, &sessions))
        .collect()
}

fn profile_for(user_id: i64, sessions: &[&CleanedSession]) -> UserProfile {
    let session_count = sessions.len() as u32;
    let booked: Vec<&&CleanedSession> = sessions
        .iter()
        .filter(|s| s.trip_status == TripStatus::Booked)
        .collect();

    let booking_count = booked.len() as u32;
    let cancellation_count = sessions
        .iter()
        .filter(|s| s.trip_status == TripStatus::Cancelled)
        .count() as u32;

    let discount_sessions = sessions.iter().filter(|s| s.raw.discount_used).count();
    let discount_usage_rate = discount_sessions as f64 / session_count as f64;

    let avg_minutes_per_session =
        mean(&collect(sessions.iter(), |s| Some(s.session_duration_minutes)));
    let avg_clicks_per_session =
        mean(&collect(sessions.iter(), |s| Some(s.raw.page_clicks as f64)));

    // Booking-derived averages only look at booked trips; a user with no
    // bookings gets the neutral 0.0.
    let avg_booking_lead_minutes = mean(&collect(booked.iter(), |s| s.booking_lead_minutes));
    let avg_cost_per_km = mean(&collect(booked.iter(), |s| s.cost_per_km));
    let avg_cost_per_night = mean(&collect(booked.iter(), |s| s.cost_per_night));
    let avg_seats_per_booking =
        mean(&collect(booked.iter(), |s| s.raw.seats.map(|v| v as f64)));
    let avg_bags_per_booking = mean(&collect(booked.iter(), |s| {
        s.raw.checked_bags.map(|v| v as f64)
    }));

    let weekday_travel_share = mean(&collect(booked.iter(), |s| {
        s.raw.check_in.map(|ci| {
            if is_weekday(ci.date().weekday()) {
                1.0
            } else {
                0.0
            }
        })
    }));

    // User attributes are denormalized onto every session row; any row of
    // the group carries them.
    let age = sessions[0].raw.age;
    let signup_date = sessions[0].raw.signup_date;

    UserProfile {
        user_id,
        session_count,
        booking_count,
        cancellation_count,
        discount_usage_rate,
        avg_minutes_per_session,
        avg_clicks_per_session,
        avg_booking_lead_minutes,
        avg_cost_per_km,
        avg_cost_per_night,
        avg_seats_per_booking,
        avg_bags_per_booking,
        weekday_travel_share,
        age,
        age_bracket: AgeBracket::from_age(age),
        signup_date,
    }
}

fn is_weekday(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Safe mean: zero observations yield the neutral 0.0 instead of a
/// division fault.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn collect<T, I, F>(sessions: I, extract: F) -> Vec<f64>
where
    I: Iterator<Item = T>,
    F: Fn(&T) -> Option<f64>,
{
    sessions.filter_map(|s| extract(&s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean_session;
    use crate::data::test_session;

    fn booked_session(user_id: i64, start: &str, check_in: &str) -> CleanedSession {
        let mut raw = test_session(user_id, start);
        raw.booked = true;
        let ci: chrono::NaiveDateTime = check_in.parse().unwrap();
        raw.check_in = Some(ci);
        raw.check_out = Some(ci + chrono::Duration::days(2));
        raw.seats = Some(2);
        raw.checked_bags = Some(1);
        raw.flight_cost = Some(400.0);
        raw.distance_km = Some(1000.0);
        raw.hotel_cost = Some(300.0);
        clean_session(raw).unwrap()
    }

    #[test]
    fn test_one_profile_per_user() {
        let sessions = vec![
            clean_session(test_session(1, "2023-02-01T09:00:00")).unwrap(),
            clean_session(test_session(2, "2023-02-01T10:00:00")).unwrap(),
            clean_session(test_session(1, "2023-02-02T09:00:00")).unwrap(),
        ];
        let profiles = aggregate_users(&sessions);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].user_id, 1);
        assert_eq!(profiles[0].session_count, 2);
        assert_eq!(profiles[1].user_id, 2);
    }

    #[test]
    fn test_browsing_only_user_gets_neutral_averages() {
        let sessions = vec![clean_session(test_session(1, "2023-02-01T09:00:00")).unwrap()];
        let profile = &aggregate_users(&sessions)[0];

        assert_eq!(profile.booking_count, 0);
        assert_eq!(profile.avg_cost_per_km, 0.0);
        assert_eq!(profile.avg_seats_per_booking, 0.0);
        assert_eq!(profile.weekday_travel_share, 0.0);
    }

    #[test]
    fn test_booking_averages_use_per_trip_ratios() {
        // 2023-03-01 is a Wednesday, 2023-03-04 a Saturday.
        let sessions = vec![
            booked_session(1, "2023-02-01T09:00:00", "2023-03-01T15:00:00"),
            booked_session(1, "2023-02-02T09:00:00", "2023-03-04T15:00:00"),
        ];
        let profile = &aggregate_users(&sessions)[0];

        assert_eq!(profile.booking_count, 2);
        // 400 / 1000 km per trip, averaged.
        assert!((profile.avg_cost_per_km - 0.4).abs() < 1e-9);
        // 300 / 2 nights per trip, averaged.
        assert!((profile.avg_cost_per_night - 150.0).abs() < 1e-9);
        assert!((profile.weekday_travel_share - 0.5).abs() < 1e-9);
        assert!((profile.avg_seats_per_booking - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_discount_usage_rate() {
        let mut with_discount = test_session(1, "2023-02-01T09:00:00");
        with_discount.discount_used = true;
        let sessions = vec![
            clean_session(with_discount).unwrap(),
            clean_session(test_session(1, "2023-02-02T09:00:00")).unwrap(),
        ];
        let profile = &aggregate_users(&sessions)[0];
        assert!((profile.discount_usage_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_age_bracket_boundaries() {
        assert_eq!(AgeBracket::from_age(24), AgeBracket::Under25);
        assert_eq!(AgeBracket::from_age(25), AgeBracket::From25To39);
        assert_eq!(AgeBracket::from_age(59), AgeBracket::From40To59);
        assert_eq!(AgeBracket::from_age(60), AgeBracket::Senior);
    }
}
