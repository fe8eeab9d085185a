//! Session cleaning: per-row repair of raw trip fields
//!
//! Pure per-row transformation with no cross-row state. Rows whose trip
//! fields cannot be repaired are excluded and counted by the caller.

use crate::data::RawSession;

/// Outcome of a session with respect to a trip.
///
/// Cancellation takes precedence when both flags are inconsistently set, so
/// a session can never be both booked and cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStatus {
    Booked,
    Cancelled,
    None,
}

/// RawSession with corrected derived fields.
#[derive(Debug, Clone)]
pub struct CleanedSession {
    pub raw: RawSession,
    /// Repaired stay length, never negative.
    pub nights_cleaned: i64,
    pub trip_status: TripStatus,
    pub session_duration_minutes: f64,
    /// Minutes between session start and the trip's check-in, when a trip
    /// with a check-in time exists.
    pub booking_lead_minutes: Option<f64>,
    pub cost_per_km: Option<f64>,
    pub cost_per_night: Option<f64>,
}

/// Clean one raw session. Returns `None` when the row is unrecoverable:
/// trip night data is present but neither the nights repair rules nor the
/// calendar dates can determine a stay length.
pub fn clean_session(raw: RawSession) -> Option<CleanedSession> {
    let trip_status = derive_trip_status(&raw);
    let nights_cleaned = clean_nights(&raw)?;

    let session_duration_minutes =
        ((raw.session_end - raw.session_start).num_seconds() as f64 / 60.0).max(0.0);

    let booking_lead_minutes = raw
        .check_in
        .map(|ci| ((ci - raw.session_start).num_seconds() as f64 / 60.0).max(0.0));

    let cost_per_km = match (raw.flight_cost, raw.distance_km) {
        (Some(cost), Some(km)) if km > 0.0 => Some(cost / km),
        _ => None,
    };
    let cost_per_night = match raw.hotel_cost {
        Some(cost) if nights_cleaned > 0 => Some(cost / nights_cleaned as f64),
        _ => None,
    };

    Some(CleanedSession {
        raw,
        nights_cleaned,
        trip_status,
        session_duration_minutes,
        booking_lead_minutes,
        cost_per_km,
        cost_per_night,
    })
}

/// Clean a batch of sessions, counting excluded unrecoverable rows.
pub fn clean_sessions(sessions: Vec<RawSession>) -> (Vec<CleanedSession>, usize) {
    let total = sessions.len();
    let cleaned: Vec<CleanedSession> = sessions.into_iter().filter_map(clean_session).collect();
    let excluded = total - cleaned.len();
    (cleaned, excluded)
}

/// Nights repair rules:
/// - negative nights with no recorded return time is a data-entry sign
///   error: flip the sign
/// - zero nights with no recorded return time is a one-night minimum stay
/// - otherwise recompute from the check-in/check-out calendar dates
fn clean_nights(raw: &RawSession) -> Option<i64> {
    match (raw.nights, raw.return_time) {
        (Some(n), None) if n < 0 => Some(-n),
        (Some(0), None) => Some(1),
        _ => match (raw.check_in, raw.check_out) {
            (Some(check_in), Some(check_out)) => {
                Some((check_out.date() - check_in.date()).num_days().max(0))
            }
            // Browsing-only session, no trip to repair.
            (None, None) if raw.nights.is_none() => Some(0),
            _ => None,
        },
    }
}

fn derive_trip_status(raw: &RawSession) -> TripStatus {
    if raw.cancelled {
        TripStatus::Cancelled
    } else if raw.booked {
        TripStatus::Booked
    } else {
        TripStatus::None
    }
}
