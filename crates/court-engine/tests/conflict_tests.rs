//! Tests for admission checks: interval, court state, business hours, overlap.

mod common;

use chrono::{DateTime, Utc};
use common::{booking, hcm_court, store_with, utc};
use court_engine::conflict::{CandidateKind, ConflictDetector};
use court_engine::court::END_OF_DAY;
use court_engine::store::{MemoryStore, Snapshot};
use court_engine::{BookingError, BookingStatus, BusinessHourRule, Court};

fn check(
    store: &MemoryStore,
    court: &Court,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), BookingError> {
    ConflictDetector::new(store).check_admissible(court, start, end, CandidateKind::Single)
}

// ---------------------------------------------------------------------------
// Business-hours boundaries (06:00-22:00 local = 23:00Z previous day - 15:00Z)
// ---------------------------------------------------------------------------

#[test]
fn full_open_window_is_admissible() {
    let store = store_with(vec![hcm_court()]);
    let court = hcm_court();
    assert!(check(&store, &court, utc(2024, 6, 2, 23, 0), utc(2024, 6, 3, 15, 0)).is_ok());
}

#[test]
fn one_minute_before_open_is_rejected() {
    let store = store_with(vec![hcm_court()]);
    let start = utc(2024, 6, 2, 22, 59);
    let err = check(&store, &hcm_court(), start, utc(2024, 6, 3, 15, 0)).unwrap_err();
    assert!(matches!(err, BookingError::OutsideBusinessHours { .. }));
}

#[test]
fn one_minute_after_close_is_rejected() {
    let store = store_with(vec![hcm_court()]);
    let end = utc(2024, 6, 3, 15, 1);
    let err = check(&store, &hcm_court(), utc(2024, 6, 2, 23, 0), end).unwrap_err();
    assert!(matches!(err, BookingError::OutsideBusinessHours { .. }));
}

#[test]
fn closed_day_rejects_everything() {
    let mut court = hcm_court();
    court.upsert_rule(BusinessHourRule::closed(1)).unwrap();
    let store = store_with(vec![court.clone()]);

    let err = check(&store, &court, utc(2024, 6, 3, 1, 0), utc(2024, 6, 3, 2, 0)).unwrap_err();
    assert_eq!(err.kind(), "outside_business_hours");
}

#[test]
fn close_at_midnight_admits_slot_ending_at_midnight() {
    let mut court = hcm_court();
    court
        .upsert_rule(BusinessHourRule::open(6, 8 * 60, END_OF_DAY))
        .unwrap();
    let store = store_with(vec![court.clone()]);

    // Saturday 22:00-24:00 local.
    assert!(check(&store, &court, utc(2024, 6, 8, 15, 0), utc(2024, 6, 8, 17, 0)).is_ok());
}

#[test]
fn midnight_crossing_depends_on_candidate_kind() {
    let mut court = hcm_court();
    court.default_close_time = Some(END_OF_DAY);
    let store = store_with(vec![court.clone()]);
    let detector = ConflictDetector::new(&*store);

    // 23:00-01:00 local.
    let start = utc(2024, 6, 3, 16, 0);
    let end = utc(2024, 6, 3, 18, 0);

    let single = detector
        .check_admissible(&court, start, end, CandidateKind::Single)
        .unwrap_err();
    let recurring = detector
        .check_admissible(&court, start, end, CandidateKind::Recurring)
        .unwrap_err();

    assert!(matches!(single, BookingError::OutsideBusinessHours { .. }));
    assert!(matches!(recurring, BookingError::CrossesMidnight { .. }));
}

// ---------------------------------------------------------------------------
// Ordering of checks
// ---------------------------------------------------------------------------

#[test]
fn inverted_interval_is_reported_first() {
    let mut court = hcm_court();
    court.active = false;
    let store = store_with(vec![court.clone()]);

    let err = check(&store, &court, utc(2024, 6, 3, 3, 0), utc(2024, 6, 3, 1, 0)).unwrap_err();
    assert!(matches!(err, BookingError::InvalidInterval(_)));
}

#[test]
fn inactive_court_is_reported_before_hours() {
    let mut court = hcm_court();
    court.active = false;
    let store = store_with(vec![court.clone()]);

    // Outside hours as well.
    let err = check(&store, &court, utc(2024, 6, 3, 20, 0), utc(2024, 6, 3, 21, 0)).unwrap_err();
    assert!(matches!(err, BookingError::CourtInactive(1)));
}

#[test]
fn unknown_timezone_is_reported() {
    let mut court = hcm_court();
    court.timezone = "Mars/Olympus_Mons".into();
    let store = store_with(vec![court.clone()]);

    let err = check(&store, &court, utc(2024, 6, 3, 1, 0), utc(2024, 6, 3, 2, 0)).unwrap_err();
    assert!(matches!(err, BookingError::InvalidTimezone(_)));
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

fn store_with_booking(status: BookingStatus) -> MemoryStore {
    MemoryStore::from_snapshot(Snapshot {
        courts: vec![hcm_court()],
        bookings: vec![booking(
            7,
            1,
            utc(2024, 6, 3, 1, 0),
            utc(2024, 6, 3, 3, 0),
            200_000,
            status,
        )],
    })
}

#[test]
fn overlapping_booking_is_named() {
    let store = store_with_booking(BookingStatus::Confirmed);
    let (start, end) = (utc(2024, 6, 3, 2, 0), utc(2024, 6, 3, 4, 0));
    let err = check(&store, &hcm_court(), start, end).unwrap_err();
    assert!(matches!(err, BookingError::Overlap { existing: Some(7), .. }));
}

#[test]
fn touching_intervals_do_not_conflict() {
    let store = store_with_booking(BookingStatus::Pending);
    let court = hcm_court();
    assert!(check(&store, &court, utc(2024, 6, 3, 3, 0), utc(2024, 6, 3, 4, 0)).is_ok());
    assert!(check(&store, &court, utc(2024, 6, 3, 0, 0), utc(2024, 6, 3, 1, 0)).is_ok());
}

#[test]
fn contained_interval_conflicts() {
    let store = store_with_booking(BookingStatus::Pending);
    let (start, end) = (utc(2024, 6, 3, 1, 30), utc(2024, 6, 3, 2, 0));
    let err = check(&store, &hcm_court(), start, end).unwrap_err();
    assert_eq!(err.kind(), "overlap");
}

#[test]
fn cancelled_bookings_do_not_block() {
    let store = store_with_booking(BookingStatus::Cancelled);
    assert!(check(&store, &hcm_court(), utc(2024, 6, 3, 1, 0), utc(2024, 6, 3, 3, 0)).is_ok());
}

#[test]
fn other_courts_do_not_block() {
    let mut second = hcm_court();
    second.id = 2;
    let store = MemoryStore::from_snapshot(Snapshot {
        courts: vec![hcm_court(), second.clone()],
        bookings: vec![booking(
            7,
            1,
            utc(2024, 6, 3, 1, 0),
            utc(2024, 6, 3, 3, 0),
            200_000,
            BookingStatus::Pending,
        )],
    });
    assert!(check(&store, &second, utc(2024, 6, 3, 1, 0), utc(2024, 6, 3, 3, 0)).is_ok());
}
