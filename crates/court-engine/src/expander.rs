//! Weekly recurrence expansion -- turns a fixed-booking request into concrete
//! candidate intervals in the court's time zone.
//!
//! Occurrence dates come from one RFC 5545 rule per weekday
//! (`FREQ=WEEKLY;BYDAY=<d>;COUNT=<weeks>`) expanded with the `rrule` crate,
//! which yields the first matching date on/after the anchor and then every
//! 7 days. Wall-clock times are applied afterwards with [`DstPolicy::ShiftForward`].
//!
//! Expansion is eager: every candidate is validated before anything is written.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::config::SchedulerLimits;
use crate::dst::{self, DstPolicy};
use crate::error::{BookingError, Result};
use crate::hours::weekday_index;

/// RFC 5545 weekday codes indexed Sunday = 0.
const BYDAY: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// A weekly pattern anchored to a local date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    pub anchor_date: NaiveDate,
    /// Weekdays, Sunday = 0. Duplicates are ignored.
    pub weekdays: Vec<u8>,
    pub start_hour: u32,
    pub duration_hours: u32,
    pub week_count: u32,
}

impl RecurrenceSpec {
    /// # Errors
    /// `ConfigInvalid` for an empty or out-of-range weekday set, a start hour,
    /// duration or week count outside `limits`.
    pub fn validate(&self, limits: &SchedulerLimits) -> Result<()> {
        if self.weekdays.is_empty() {
            return Err(BookingError::ConfigInvalid(
                "weekdays must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self.weekdays.iter().find(|d| **d > 6) {
            return Err(BookingError::ConfigInvalid(format!(
                "weekday must be 0..=6, got {bad}"
            )));
        }
        if self.start_hour > limits.max_start_hour {
            return Err(BookingError::ConfigInvalid(format!(
                "start_hour must be 0..={}, got {}",
                limits.max_start_hour, self.start_hour
            )));
        }
        if self.duration_hours == 0 || self.duration_hours > limits.max_duration_hours {
            return Err(BookingError::ConfigInvalid(format!(
                "duration_hours must be 1..={}, got {}",
                limits.max_duration_hours, self.duration_hours
            )));
        }
        if self.week_count == 0 || self.week_count > limits.max_weeks {
            return Err(BookingError::ConfigInvalid(format!(
                "week_count must be 1..={}, got {}",
                limits.max_weeks, self.week_count
            )));
        }
        Ok(())
    }

    /// Sorted, deduplicated weekdays.
    pub fn unique_weekdays(&self) -> Vec<u8> {
        let mut days = self.weekdays.clone();
        days.sort_unstable();
        days.dedup();
        days
    }
}

/// One concrete candidate of a recurring request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// 1-based week index within the pattern.
    pub week: u32,
    pub weekday: u8,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Expand `spec` in `timezone` into chronologically ordered occurrences.
///
/// The end of each occurrence is the resolved local start plus
/// `duration_hours` of wall clock, so it may land on the next calendar day;
/// admission rejects those.
///
/// # Errors
/// `ConfigInvalid` if `spec` fails validation, `InvalidTimezone` if
/// `timezone` is not an IANA identifier.
pub fn expand(
    spec: &RecurrenceSpec,
    timezone: &str,
    limits: &SchedulerLimits,
) -> Result<Vec<Occurrence>> {
    spec.validate(limits)?;

    let tz: Tz = timezone
        .parse()
        .map_err(|_| BookingError::InvalidTimezone(timezone.to_string()))?;

    let start_minute = spec.start_hour * 60;
    let duration = Duration::hours(i64::from(spec.duration_hours));

    let mut occurrences = Vec::new();
    for weekday in spec.unique_weekdays() {
        let dates = weekly_dates(spec.anchor_date, weekday, spec.week_count, timezone)?;
        for (index, date) in dates.into_iter().enumerate() {
            let start = local_instant(&tz, date, start_minute)?;
            let end = local_end(&tz, start, duration);
            occurrences.push(Occurrence {
                week: index as u32 + 1,
                weekday,
                date,
                start,
                end,
            });
        }
    }

    occurrences.sort_by_key(|o| o.start);
    Ok(occurrences)
}

/// The first `count` local dates on/after `anchor` falling on `weekday`.
fn weekly_dates(
    anchor: NaiveDate,
    weekday: u8,
    count: u32,
    timezone: &str,
) -> Result<Vec<NaiveDate>> {
    // Anchored at noon: only dates are taken from the rule, and noon is clear
    // of DST transitions.
    let rule_text = format!(
        "DTSTART;TZID={}:{}T120000\nRRULE:FREQ=WEEKLY;BYDAY={};COUNT={}",
        timezone,
        anchor.format("%Y%m%d"),
        BYDAY[weekday as usize],
        count
    );

    let rule_set: RRuleSet = rule_text
        .parse()
        .map_err(|e| BookingError::ConfigInvalid(format!("recurrence rule rejected: {e}")))?;

    let limit = u16::try_from(count).unwrap_or(u16::MAX);
    let dates: Vec<NaiveDate> = rule_set
        .all(limit)
        .dates
        .into_iter()
        .map(|dt| dt.date_naive())
        .collect();

    if dates.len() != count as usize || dates.iter().any(|d| weekday_index(*d) != weekday) {
        return Err(BookingError::ConfigInvalid(format!(
            "weekday {weekday} expanded to {} of {count} occurrences",
            dates.len()
        )));
    }
    Ok(dates)
}

fn local_instant(tz: &Tz, date: NaiveDate, minute_of_day: u32) -> Result<DateTime<Utc>> {
    dst::at_minute(tz, date, minute_of_day, DstPolicy::ShiftForward).ok_or_else(|| {
        BookingError::InvalidInterval(format!(
            "no instant for {date} minute {minute_of_day} in {tz}"
        ))
    })
}

/// `duration` of wall clock after the resolved local `start`. A start moved
/// out of a DST gap therefore keeps its full length.
fn local_end(tz: &Tz, start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    let wall_end = start.with_timezone(tz).naive_local() + duration;
    dst::localize(tz, wall_end, DstPolicy::ShiftForward)
        .filter(|end| *end > start)
        .unwrap_or(start + duration)
}
