//! Admission checks for a candidate booking interval.
//!
//! Checks run in order and the first failure wins: interval shape, court
//! state, business hours in the court's zone, then overlap with existing
//! non-cancelled bookings. Intervals are half-open, so a booking ending exactly
//! when another starts is NOT a conflict.
//!
//! The detector only reads. Callers must hold the court's critical section
//! across the check and the insert that follows it.

use chrono::{DateTime, NaiveTime, Utc};

use crate::booking::Booking;
use crate::court::Court;
use crate::error::{BookingError, Result};
use crate::hours::{self, DayHours};
use crate::store::BookingStore;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// How the candidate was produced; decides how a midnight crossing is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Single,
    Recurring,
}

/// Length in seconds of the intersection of `[a_start, a_end)` and
/// `[b_start, b_end)`, or 0 when they do not intersect.
pub fn overlap_seconds(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> i64 {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    (end - start).num_seconds().max(0)
}

/// First non-cancelled booking intersecting `[start, end)`.
pub fn first_overlap(
    existing: &[Booking],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<&Booking> {
    existing
        .iter()
        .filter(|b| !b.is_cancelled() && b.overlaps(start, end))
        .min_by_key(|b| (b.start_time, b.id))
}

pub fn check_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(BookingError::InvalidInterval(format!(
            "end {end} must be after start {start}"
        )));
    }
    Ok(())
}

/// The interval must sit inside the open window of the start's local day.
///
/// An end exactly at the following local midnight still belongs to the start's
/// day. Anything later crosses midnight: reported as `CrossesMidnight` for
/// recurring candidates and `OutsideBusinessHours` for single bookings.
pub fn check_business_hours(
    court: &Court,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    kind: CandidateKind,
) -> Result<()> {
    let tz = court.tz()?;
    let local_start = start.with_timezone(&tz).naive_local();
    let local_end = end.with_timezone(&tz).naive_local();
    let date = local_start.date();
    let midnight = date.and_time(NaiveTime::MIN);

    let start_secs = (local_start - midnight).num_seconds();
    let end_secs = (local_end - midnight).num_seconds();

    if end_secs > SECONDS_PER_DAY {
        return Err(match kind {
            CandidateKind::Recurring => BookingError::CrossesMidnight { start, end },
            CandidateKind::Single => BookingError::OutsideBusinessHours { start, end },
        });
    }

    match hours::resolve(court, date)? {
        DayHours::Open(window) if window.contains_seconds(start_secs, end_secs) => Ok(()),
        _ => Err(BookingError::OutsideBusinessHours { start, end }),
    }
}

pub struct ConflictDetector<'a> {
    bookings: &'a dyn BookingStore,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(bookings: &'a dyn BookingStore) -> Self {
        Self { bookings }
    }

    /// Decide whether `[start, end)` may be booked on `court`.
    pub fn check_admissible(
        &self,
        court: &Court,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kind: CandidateKind,
    ) -> Result<()> {
        check_interval(start, end)?;

        if !court.active {
            return Err(BookingError::CourtInactive(court.id));
        }

        check_business_hours(court, start, end, kind)?;

        let existing = self.bookings.find_overlapping(court.id, start, end)?;
        if let Some(found) = first_overlap(&existing, start, end) {
            return Err(BookingError::Overlap {
                start,
                end,
                existing: Some(found.id),
            });
        }
        Ok(())
    }
}
