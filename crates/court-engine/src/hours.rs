//! Effective business hours of a court on a given local date.
//!
//! Resolution order: the weekday's override rule (closed or explicit hours),
//! then the court's default hours. A day with neither cannot be validated.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::court::{hhmm, Court, END_OF_DAY};
use crate::error::{BookingError, Result};

/// Open hours of one local day as minutes-of-day, `open_minute < close_minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpenWindow {
    #[serde(serialize_with = "hhmm::serialize")]
    pub open_minute: u16,
    #[serde(serialize_with = "hhmm::serialize")]
    pub close_minute: u16,
}

impl OpenWindow {
    pub fn minutes(&self) -> u32 {
        u32::from(self.close_minute - self.open_minute)
    }

    /// Whether `[start, end)`, in seconds since local midnight, fits the window.
    pub fn contains_seconds(&self, start: i64, end: i64) -> bool {
        start >= i64::from(self.open_minute) * 60 && end <= i64::from(self.close_minute) * 60
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayHours {
    Closed,
    Open(OpenWindow),
}

impl DayHours {
    pub fn open_minutes(&self) -> u32 {
        match self {
            DayHours::Closed => 0,
            DayHours::Open(window) => window.minutes(),
        }
    }
}

/// Weekday number with Sunday = 0 .. Saturday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Resolve the court's hours on local `date`.
///
/// # Errors
/// `MissingHoursConfig` when no rule covers the weekday and the court has no
/// default hours; `ConfigInvalid` when the applicable hours are inverted.
pub fn resolve(court: &Court, date: NaiveDate) -> Result<DayHours> {
    let weekday = weekday_index(date);

    let (open, close) = match court.rule_for(weekday) {
        Some(rule) if rule.is_closed => return Ok(DayHours::Closed),
        Some(rule) => match (rule.open_time, rule.close_time) {
            (Some(open), Some(close)) => (open, close),
            _ => {
                return Err(BookingError::ConfigInvalid(format!(
                    "court {} weekday {} rule has no hours",
                    court.id, weekday
                )))
            }
        },
        None => match (court.default_open_time, court.default_close_time) {
            (Some(open), Some(close)) => (open, close),
            _ => {
                return Err(BookingError::MissingHoursConfig {
                    court_id: court.id,
                    weekday,
                })
            }
        },
    };

    // Rules are validated on write; stored data may predate that.
    if open >= close || close > END_OF_DAY {
        return Err(BookingError::ConfigInvalid(format!(
            "court {} weekday {} hours {} - {} are inverted",
            court.id,
            weekday,
            hhmm::format(open),
            hhmm::format(close)
        )));
    }

    Ok(DayHours::Open(OpenWindow {
        open_minute: open,
        close_minute: close,
    }))
}

/// Resolve the hours of the local day containing `instant` in the court's zone.
pub fn resolve_at(court: &Court, instant: DateTime<Utc>) -> Result<(NaiveDate, DayHours)> {
    let date = instant.with_timezone(&court.tz()?).date_naive();
    Ok((date, resolve(court, date)?))
}
