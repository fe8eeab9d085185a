//! Raw session ingestion and cohort filtering
//!
//! Loads RawSession records from a CSV source using Polars. Rows with
//! unrecoverable structural problems (missing user id, unparseable
//! timestamps) are excluded and counted, never silently dropped.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// One user's one visit. Immutable source-of-truth record.
///
/// Trip fields are absent for browsing-only sessions. `age` and
/// `signup_date` are user attributes denormalized onto every session row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSession {
    pub session_id: String,
    pub user_id: i64,
    pub session_start: NaiveDateTime,
    pub session_end: NaiveDateTime,
    pub page_clicks: u32,
    pub booked: bool,
    pub cancelled: bool,
    pub discount_used: bool,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub return_time: Option<NaiveDateTime>,
    pub nights: Option<i64>,
    pub seats: Option<i64>,
    pub checked_bags: Option<i64>,
    pub rooms: Option<i64>,
    pub destination: Option<String>,
    pub distance_km: Option<f64>,
    pub flight_cost: Option<f64>,
    pub hotel_cost: Option<f64>,
    pub age: i64,
    pub signup_date: NaiveDate,
}

/// Result of loading a raw CSV: parsed sessions plus the count of rows that
/// could not be parsed into a structurally valid RawSession.
#[derive(Debug)]
pub struct LoadedSessions {
    pub sessions: Vec<RawSession>,
    pub malformed_records: usize,
}

/// Load RawSession records from a CSV file.
///
/// Timestamp columns are kept as strings by Polars and parsed with chrono so
/// that a non-parseable timestamp marks the row malformed instead of failing
/// the whole load.
pub fn load_sessions(file_path: &str) -> crate::Result<LoadedSessions> {
    let df = CsvReader::from_path(file_path)?.has_header(true).finish()?;

    if df.height() == 0 {
        anyhow::bail!("no rows found in {}", file_path);
    }

    let session_id = utf8_col(&df, "session_id")?;
    let user_id = i64_col(&df, "user_id")?;
    let session_start = utf8_col(&df, "session_start")?;
    let session_end = utf8_col(&df, "session_end")?;
    let page_clicks = i64_col(&df, "page_clicks")?;
    let booked = i64_col(&df, "booked")?;
    let cancelled = i64_col(&df, "cancelled")?;
    let discount_used = i64_col(&df, "discount_used")?;
    let check_in = utf8_col(&df, "check_in")?;
    let check_out = utf8_col(&df, "check_out")?;
    let return_time = utf8_col(&df, "return_time")?;
    let nights = i64_col(&df, "nights")?;
    let seats = i64_col(&df, "seats")?;
    let checked_bags = i64_col(&df, "checked_bags")?;
    let rooms = i64_col(&df, "rooms")?;
    let destination = utf8_col(&df, "destination")?;
    let distance_km = f64_col(&df, "distance_km")?;
    let flight_cost = f64_col(&df, "flight_cost")?;
    let hotel_cost = f64_col(&df, "hotel_cost")?;
    let age = i64_col(&df, "age")?;
    let signup_date = utf8_col(&df, "signup_date")?;

    let mut sessions = Vec::with_capacity(df.height());
    let mut malformed_records = 0;

    for i in 0..df.height() {
        let parsed = (|| {
            let session_id = session_id.get(i)?.to_string();
            let user_id = user_id.get(i)?;
            let session_start = parse_datetime(session_start.get(i)?)?;
            let session_end = parse_datetime(session_end.get(i)?)?;
            let age = age.get(i)?;
            let signup_date = parse_date(signup_date.get(i)?)?;

            Some(RawSession {
                session_id,
                user_id,
                session_start,
                session_end,
                page_clicks: page_clicks.get(i).unwrap_or(0).max(0) as u32,
                booked: flag(booked.get(i)),
                cancelled: flag(cancelled.get(i)),
                discount_used: flag(discount_used.get(i)),
                check_in: check_in.get(i).and_then(parse_datetime),
                check_out: check_out.get(i).and_then(parse_datetime),
                return_time: return_time.get(i).and_then(parse_datetime),
                nights: nights.get(i),
                seats: seats.get(i),
                checked_bags: checked_bags.get(i),
                rooms: rooms.get(i),
                destination: destination.get(i).map(|s| s.to_string()),
                distance_km: distance_km.get(i),
                flight_cost: flight_cost.get(i),
                hotel_cost: hotel_cost.get(i),
                age,
                signup_date,
            })
        })();

        match parsed {
            Some(session) => sessions.push(session),
            None => malformed_records += 1,
        }
    }

    log::debug!(
        "loaded {} sessions ({} malformed rows excluded)",
        sessions.len(),
        malformed_records
    );

    Ok(LoadedSessions {
        sessions,
        malformed_records,
    })
}

/// Restrict sessions to the configured window and to active users.
///
/// A user is active when their count of sessions with
/// `session_start >= cohort_start` is strictly greater than `min_sessions`:
/// a user with exactly `min_sessions` qualifying sessions is excluded.
pub fn filter_active_cohort(
    sessions: &[RawSession],
    cohort_start: NaiveDate,
    min_sessions: u32,
) -> Vec<RawSession> {
    let qualifying: Vec<&RawSession> = sessions
        .iter()
        .filter(|s| s.session_start.date() >= cohort_start)
        .collect();

    let mut counts: HashMap<i64, u32> = HashMap::new();
    for session in &qualifying {
        *counts.entry(session.user_id).or_insert(0) += 1;
    }

    qualifying
        .into_iter()
        .filter(|s| counts.get(&s.user_id).copied().unwrap_or(0) > min_sessions)
        .cloned()
        .collect()
}

fn flag(value: Option<i64>) -> bool {
    value.unwrap_or(0) != 0
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn utf8_col<'a>(df: &'a DataFrame, name: &str) -> crate::Result<Utf8Chunked> {
    Ok(df.column(name)?.cast(&DataType::Utf8)?.utf8()?.clone())
}

fn i64_col(df: &DataFrame, name: &str) -> crate::Result<Int64Chunked> {
    Ok(df.column(name)?.cast(&DataType::Int64)?.i64()?.clone())
}

fn f64_col(df: &DataFrame, name: &str) -> crate::Result<Float64Chunked> {
    Ok(df.column(name)?.cast(&DataType::Float64)?.f64()?.clone())
}

/// Browsing-only session fixture shared by the unit tests of downstream
/// pipeline stages.
#[cfg(test)]
pub(crate) fn test_session(user_id: i64, start: &str) -> RawSession {
    RawSession {
        session_id: format!("s-{user_id}-{start}"),
        user_id,
        session_start: parse_datetime(start).unwrap(),
        session_end: parse_datetime(start)
            .map(|t| t + chrono::Duration::minutes(10))
            .unwrap(),
        page_clicks: 12,
        booked: false,
        cancelled: false,
        discount_used: false,
        check_in: None,
        check_out: None,
        return_time: None,
        nights: None,
        seats: None,
        checked_bags: None,
        rooms: None,
        destination: None,
        distance_km: None,
        flight_cost: None,
        hotel_cost: None,
        age: 35,
        signup_date: parse_date("2022-06-01").unwrap(),
    }
}
