//! Integration tests for SegForge

use std::io::Write;

use segforge::{load_sessions, run_segmentation, PipelineConfig};
use tempfile::NamedTempFile;

const HEADER: &str = "session_id,user_id,session_start,session_end,page_clicks,booked,\
cancelled,discount_used,check_in,check_out,return_time,nights,seats,checked_bags,rooms,\
destination,distance_km,flight_cost,hotel_cost,age,signup_date";

struct SessionRow {
    user_id: i64,
    day: u32,
    clicks: u32,
    booked: bool,
    discount: bool,
    age: i64,
}

impl SessionRow {
    fn new(user_id: i64, day: u32) -> Self {
        SessionRow {
            user_id,
            day,
            clicks: 10,
            booked: false,
            discount: false,
            age: 40,
        }
    }

    fn to_csv(&self) -> String {
        let trip = if self.booked {
            // Two-night city trip shortly after the session.
            format!(
                "2023-03-{ci:02}T15:00:00,2023-03-{co:02}T11:00:00,,2,1,1,1,Lisbon,1200.5,360.0,220.0",
                ci = self.day + 2,
                co = self.day + 4
            )
        } else {
            ",,,,,,,,,,".to_string()
        };
        format!(
            "s{uid}-{day},{uid},2023-02-{day:02}T09:00:00,2023-02-{day:02}T09:30:00,{clicks},{booked},0,{discount},{trip},{age},2022-06-01",
            uid = self.user_id,
            day = self.day,
            clicks = self.clicks,
            booked = self.booked as u8,
            discount = self.discount as u8,
            age = self.age,
        )
    }
}

fn write_csv(rows: &[SessionRow]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{}", row.to_csv()).unwrap();
    }
    file
}

fn active_user(user_id: i64, sessions: u32) -> Vec<SessionRow> {
    (1..=sessions)
        .map(|day| SessionRow::new(user_id, day))
        .collect()
}

#[test]
fn test_end_to_end_pipeline() {
    let mut rows = active_user(1, 8);
    let mut booker = active_user(2, 10);
    for row in booker.iter_mut().take(4) {
        row.booked = true;
    }
    rows.extend(booker);
    let mut hunter = active_user(3, 9);
    for row in hunter.iter_mut() {
        row.discount = true;
        row.clicks = 45;
    }
    rows.extend(hunter);

    let file = write_csv(&rows);
    let loaded = load_sessions(file.path().to_str().unwrap()).unwrap();
    assert_eq!(loaded.sessions.len(), 27);
    assert_eq!(loaded.malformed_records, 0);

    let result = run_segmentation(&loaded.sessions, &PipelineConfig::default()).unwrap();

    // Partition completeness: every cohort user gets exactly one segment.
    assert_eq!(result.cohort_size, 3);
    assert_eq!(result.assignments.len(), 3);
    let summed: usize = result.summary.iter().map(|s| s.user_count).sum();
    assert_eq!(summed, result.cohort_size);

    for assignment in &result.assignments {
        assert!(!assignment.final_segment.is_empty());
        assert!(!assignment.assigned_perk.is_empty());
        assert!((0.0..=1.0).contains(&assignment.top_score));
    }

    // Summary is ordered by descending user count.
    for pair in result.summary.windows(2) {
        assert!(pair[0].user_count >= pair[1].user_count);
    }
}

#[test]
fn test_pipeline_is_idempotent() {
    let mut rows = active_user(1, 8);
    let mut booker = active_user(2, 12);
    for row in booker.iter_mut().take(6) {
        row.booked = true;
    }
    rows.extend(booker);

    let file = write_csv(&rows);
    let loaded = load_sessions(file.path().to_str().unwrap()).unwrap();
    let config = PipelineConfig::default();

    let first = run_segmentation(&loaded.sessions, &config).unwrap();
    let second = run_segmentation(&loaded.sessions, &config).unwrap();

    assert_eq!(first.assignments, second.assignments);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn test_cohort_boundary_via_csv() {
    // User 1 has exactly 7 qualifying sessions (excluded), user 2 has 8.
    let mut rows = active_user(1, 7);
    rows.extend(active_user(2, 8));

    let file = write_csv(&rows);
    let loaded = load_sessions(file.path().to_str().unwrap()).unwrap();
    let result = run_segmentation(&loaded.sessions, &PipelineConfig::default()).unwrap();

    assert_eq!(result.cohort_size, 1);
    assert_eq!(result.assignments[0].user_id, 2);
}

#[test]
fn test_malformed_rows_are_counted_not_dropped_silently() {
    let rows = active_user(1, 8);
    let file = {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in &rows {
            writeln!(file, "{}", row.to_csv()).unwrap();
        }
        // Missing user id.
        writeln!(
            file,
            "s-bad-1,,2023-02-10T09:00:00,2023-02-10T09:30:00,5,0,0,0,,,,,,,,,,,,40,2022-06-01"
        )
        .unwrap();
        // Unparseable session start.
        writeln!(
            file,
            "s-bad-2,9,not-a-time,2023-02-10T09:30:00,5,0,0,0,,,,,,,,,,,,40,2022-06-01"
        )
        .unwrap();
        file
    };

    let loaded = load_sessions(file.path().to_str().unwrap()).unwrap();
    assert_eq!(loaded.sessions.len(), 8);
    assert_eq!(loaded.malformed_records, 2);
}

#[test]
fn test_discount_heavy_user_lands_in_deal_hunter() {
    let mut rows = active_user(1, 8);
    let mut hunter = active_user(2, 10);
    for row in hunter.iter_mut() {
        row.discount = true;
        row.clicks = 60;
    }
    rows.extend(hunter);

    let file = write_csv(&rows);
    let loaded = load_sessions(file.path().to_str().unwrap()).unwrap();
    let result = run_segmentation(&loaded.sessions, &PipelineConfig::default()).unwrap();

    let hunter = result
        .assignments
        .iter()
        .find(|a| a.user_id == 2)
        .unwrap();
    assert_eq!(hunter.final_segment, "Deal Hunter");
    assert_eq!(hunter.assigned_perk, "Early Access To Flash Sales");
}
