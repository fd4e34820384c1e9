//! Tests for weekly recurrence expansion.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use court_engine::expander::{expand, RecurrenceSpec};
use court_engine::{BookingError, SchedulerLimits};

fn spec(
    anchor: (i32, u32, u32),
    weekdays: &[u8],
    start_hour: u32,
    duration_hours: u32,
    week_count: u32,
) -> RecurrenceSpec {
    RecurrenceSpec {
        anchor_date: NaiveDate::from_ymd_opt(anchor.0, anchor.1, anchor.2).unwrap(),
        weekdays: weekdays.to_vec(),
        start_hour,
        duration_hours,
        week_count,
    }
}

fn limits() -> SchedulerLimits {
    SchedulerLimits::default()
}

#[test]
fn monday_and_wednesday_for_four_weeks() {
    // 2024-06-03 is a Monday.
    let request = spec((2024, 6, 3), &[1, 3], 8, 2, 4);
    let occurrences = expand(&request, "Asia/Ho_Chi_Minh", &limits()).unwrap();
    let tz: Tz = "Asia/Ho_Chi_Minh".parse().unwrap();

    assert_eq!(occurrences.len(), 8);
    for occ in &occurrences {
        assert_eq!(occ.end - occ.start, Duration::hours(2));
        let local = occ.start.with_timezone(&tz);
        assert_eq!(local.date_naive(), occ.date);
        assert!(matches!(local.weekday(), Weekday::Mon | Weekday::Wed));
        assert_eq!(local.weekday().num_days_from_sunday() as u8, occ.weekday);
        assert_eq!(local.format("%H:%M").to_string(), "08:00");
    }

    let days: Vec<u32> = occurrences.iter().map(|o| o.date.day()).collect();
    assert_eq!(days, vec![3, 5, 10, 12, 17, 19, 24, 26]);
    assert_eq!(occurrences[0].start, Utc.with_ymd_and_hms(2024, 6, 3, 1, 0, 0).unwrap());
}

#[test]
fn week_index_counts_per_weekday() {
    let request = spec((2024, 6, 3), &[3, 1], 8, 2, 2);
    let occurrences = expand(&request, "UTC", &limits()).unwrap();
    let labels: Vec<(u32, u8)> = occurrences.iter().map(|o| (o.week, o.weekday)).collect();
    assert_eq!(labels, vec![(1, 1), (1, 3), (2, 1), (2, 3)]);
}

#[test]
fn weekday_before_anchor_starts_next_week() {
    // Anchor Friday 2024-06-07; Tuesday occurrences start 2024-06-11.
    let request = spec((2024, 6, 7), &[2], 18, 1, 3);
    let occurrences = expand(&request, "UTC", &limits()).unwrap();
    let dates: Vec<String> = occurrences.iter().map(|o| o.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-06-11", "2024-06-18", "2024-06-25"]);
}

#[test]
fn end_past_midnight_lands_on_next_day() {
    let request = spec((2024, 6, 3), &[1], 23, 2, 1);
    let occurrences = expand(&request, "UTC", &limits()).unwrap();
    assert_eq!(occurrences[0].start, Utc.with_ymd_and_hms(2024, 6, 3, 23, 0, 0).unwrap());
    assert_eq!(occurrences[0].end, Utc.with_ymd_and_hms(2024, 6, 4, 1, 0, 0).unwrap());
}

#[test]
fn spring_forward_keeps_wall_clock_times() {
    // 2026-03-08 is the first Sunday of PDT; 02:00-03:00 local does not exist.
    let request = spec((2026, 3, 2), &[0], 1, 2, 2);
    let occurrences = expand(&request, "America/Los_Angeles", &limits()).unwrap();

    // 01:00 PST -> 03:00 PDT is one real hour.
    assert_eq!(occurrences[0].start, Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap());
    assert_eq!(occurrences[0].end, Utc.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap());
    // A week later: 01:00-03:00 PDT.
    assert_eq!(occurrences[1].start, Utc.with_ymd_and_hms(2026, 3, 15, 8, 0, 0).unwrap());
    assert_eq!(occurrences[1].end, Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap());
}

#[test]
fn start_in_dst_gap_shifts_forward() {
    let request = spec((2026, 3, 8), &[0], 2, 2, 1);
    let occurrences = expand(&request, "America/Los_Angeles", &limits()).unwrap();
    // 02:00 does not exist; shifted to 03:00 PDT and still two hours long.
    assert_eq!(occurrences[0].start, Utc.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap());
    assert_eq!(occurrences[0].end, Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap());
}

#[test]
fn gap_start_keeps_full_duration_in_london() {
    // 2020-03-29 01:00-02:00 does not exist in London; 01:00 becomes 02:00 BST.
    let request = spec((2020, 3, 22), &[0], 1, 1, 2);
    let occurrences = expand(&request, "Europe/London", &limits()).unwrap();

    assert_eq!(occurrences.len(), 2);
    let gap_day = &occurrences[1];
    assert_eq!(gap_day.date, NaiveDate::from_ymd_opt(2020, 3, 29).unwrap());
    assert_eq!(gap_day.start, Utc.with_ymd_and_hms(2020, 3, 29, 1, 0, 0).unwrap());
    assert_eq!(gap_day.end, Utc.with_ymd_and_hms(2020, 3, 29, 2, 0, 0).unwrap());
    for occ in &occurrences {
        assert_eq!(occ.end - occ.start, Duration::hours(1));
    }
}

#[test]
fn fall_back_takes_earliest_instant() {
    // 2026-11-01 01:00 occurs twice in Los Angeles.
    let request = spec((2026, 11, 1), &[0], 1, 1, 1);
    let occurrences = expand(&request, "America/Los_Angeles", &limits()).unwrap();
    assert_eq!(occurrences[0].start, Utc.with_ymd_and_hms(2026, 11, 1, 8, 0, 0).unwrap());
    assert_eq!(occurrences[0].end, Utc.with_ymd_and_hms(2026, 11, 1, 10, 0, 0).unwrap());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn rejects_malformed_parameters() {
    let cases = [
        spec((2024, 6, 3), &[], 8, 2, 4),
        spec((2024, 6, 3), &[9], 8, 2, 4),
        spec((2024, 6, 3), &[1], 24, 2, 4),
        spec((2024, 6, 3), &[1], 8, 0, 4),
        spec((2024, 6, 3), &[1], 8, 13, 4),
        spec((2024, 6, 3), &[1], 8, 2, 0),
        spec((2024, 6, 3), &[1], 8, 2, 53),
    ];
    for case in &cases {
        let err = expand(case, "UTC", &limits()).unwrap_err();
        assert!(matches!(err, BookingError::ConfigInvalid(_)), "{case:?} gave {err:?}");
    }
}

#[test]
fn custom_limits_apply() {
    let tight = SchedulerLimits {
        max_weeks: 4,
        max_duration_hours: 3,
        max_start_hour: 20,
    };
    assert!(expand(&spec((2024, 6, 3), &[1], 8, 2, 4), "UTC", &tight).is_ok());
    assert!(expand(&spec((2024, 6, 3), &[1], 8, 2, 5), "UTC", &tight).is_err());
    assert!(expand(&spec((2024, 6, 3), &[1], 8, 4, 4), "UTC", &tight).is_err());
    assert!(expand(&spec((2024, 6, 3), &[1], 21, 2, 4), "UTC", &tight).is_err());
}

#[test]
fn unknown_timezone_is_rejected() {
    let err = expand(&spec((2024, 6, 3), &[1], 8, 2, 4), "Not/AZone", &limits()).unwrap_err();
    assert!(matches!(err, BookingError::InvalidTimezone(_)));
}

#[test]
fn maximum_pattern_expands_fully() {
    let request = spec((2024, 1, 1), &[0, 1, 2, 3, 4, 5, 6], 6, 1, 52);
    let occurrences = expand(&request, "Europe/London", &limits()).unwrap();
    assert_eq!(occurrences.len(), 7 * 52);
    for pair in occurrences.windows(2) {
        assert!(pair[0].start < pair[1].start);
    }
}
