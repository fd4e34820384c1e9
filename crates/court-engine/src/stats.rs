//! Monthly occupancy statistics for one court.
//!
//! The month is the court's local calendar month, `[first, first of next)`,
//! converted to instants. Cancelled bookings are ignored throughout. Each
//! qualifying booking contributes its overlap with the window to the booked
//! hours and to 24 local hour-of-day buckets, split at local hour boundaries.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::access::Actor;
use crate::booking::Booking;
use crate::conflict::overlap_seconds;
use crate::court::{Court, CourtId};
use crate::dst;
use crate::error::{BookingError, Result};
use crate::hours;
use crate::store::{BookingStore, CourtStore};

const SECONDS_PER_HOUR: i64 = 3600;

/// A local calendar month as an instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub first_day: NaiveDate,
    /// First day of the following month, exclusive.
    pub next_first_day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    /// # Errors
    /// `ConfigInvalid` for a month outside 1..=12 or an unrepresentable year.
    pub fn new(tz: &Tz, year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(BookingError::ConfigInvalid(format!(
                "month must be 1..=12, got {month}"
            )));
        }
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let first_day = first_of_month(year, month)?;
        let next_first_day = first_of_month(next_year, next_month)?;

        Ok(Self {
            year,
            month,
            first_day,
            next_first_day,
            start: dst::day_bounds(tz, first_day).0,
            end: dst::day_bounds(tz, next_first_day).0,
        })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first_day
            .iter_days()
            .take_while(move |d| *d < self.next_first_day)
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| BookingError::ConfigInvalid(format!("year {year} is out of range")))
}

/// Fill in a missing year or month from the court-local date of `now`.
///
/// # Errors
/// `ConfigInvalid` when a supplied month is outside 1..=12.
pub fn resolve_period(
    tz: &Tz,
    year: Option<i32>,
    month: Option<u32>,
    now: DateTime<Utc>,
) -> Result<(i32, u32)> {
    if let Some(m) = month {
        if !(1..=12).contains(&m) {
            return Err(BookingError::ConfigInvalid(format!(
                "month must be 1..=12, got {m}"
            )));
        }
    }
    let today = now.with_timezone(tz).date_naive();
    Ok((year.unwrap_or(today.year()), month.unwrap_or(today.month())))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub court_id: CourtId,
    pub year: i32,
    pub month: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub booking_count: usize,
    pub booked_hours: f64,
    pub available_hours: f64,
    /// `booked_hours / available_hours` clamped to `[0, 1]`; 0 when nothing is open.
    pub occupancy_rate: f64,
    pub total_revenue: Decimal,
    /// Local hours of day (0..=23) sharing the highest booked time. Empty when
    /// nothing is booked.
    pub peak_hours: Vec<u8>,
    pub peak_minutes: f64,
    /// Booked minutes per local hour of day.
    pub hourly_minutes: Vec<f64>,
}

/// Compute statistics for `court` over `year`-`month` from `bookings`.
///
/// `bookings` may contain anything; only non-cancelled bookings on the court
/// intersecting the window count.
///
/// # Errors
/// `InvalidTimezone` for a bad court zone, `ConfigInvalid` for a bad month.
pub fn monthly_stats(
    court: &Court,
    year: i32,
    month: u32,
    bookings: &[Booking],
) -> Result<MonthlyStats> {
    let tz = court.tz()?;
    let window = MonthWindow::new(&tz, year, month)?;

    let mut booked_seconds: i64 = 0;
    let mut total_revenue = Decimal::ZERO;
    let mut booking_count = 0;
    let mut buckets = [0i64; 24];

    for booking in bookings
        .iter()
        .filter(|b| b.court_id == court.id && !b.is_cancelled())
    {
        let overlap =
            overlap_seconds(booking.start_time, booking.end_time, window.start, window.end);
        if overlap == 0 {
            continue;
        }
        booked_seconds += overlap;
        total_revenue += booking.total_price;
        booking_count += 1;
        add_to_buckets(
            &mut buckets,
            &tz,
            booking.start_time.max(window.start),
            booking.end_time.min(window.end),
        );
    }

    let available_minutes: u32 = window
        .days()
        .map(|date| match hours::resolve(court, date) {
            Ok(day) => day.open_minutes(),
            Err(err) => {
                warn!(
                    court_id = court.id,
                    %date,
                    error = %err,
                    "no business hours for day, counting as closed"
                );
                0
            }
        })
        .sum();

    let booked_hours = booked_seconds as f64 / SECONDS_PER_HOUR as f64;
    let available_hours = f64::from(available_minutes) / 60.0;
    let occupancy_rate = if available_hours > 0.0 {
        (booked_hours / available_hours).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let peak = buckets.iter().copied().max().unwrap_or(0);
    let peak_hours = if peak > 0 {
        (0u8..24).filter(|h| buckets[*h as usize] == peak).collect()
    } else {
        Vec::new()
    };

    Ok(MonthlyStats {
        court_id: court.id,
        year: window.year,
        month: window.month,
        window_start: window.start,
        window_end: window.end,
        booking_count,
        booked_hours,
        available_hours,
        occupancy_rate,
        total_revenue,
        peak_hours,
        peak_minutes: peak as f64 / 60.0,
        hourly_minutes: buckets.iter().map(|s| *s as f64 / 60.0).collect(),
    })
}

/// Spread `[start, end)` over local hour-of-day buckets, in seconds.
fn add_to_buckets(buckets: &mut [i64; 24], tz: &Tz, start: DateTime<Utc>, end: DateTime<Utc>) {
    let mut cursor = start;
    while cursor < end {
        let local = cursor.with_timezone(tz);
        let into_hour = i64::from(local.minute() * 60 + local.second());
        let boundary = cursor + chrono::Duration::seconds(SECONDS_PER_HOUR - into_hour);
        let segment_end = boundary.min(end);
        buckets[local.hour() as usize] += (segment_end - cursor).num_seconds();
        cursor = segment_end;
    }
}

pub struct StatisticsEngine {
    courts: Arc<dyn CourtStore>,
    bookings: Arc<dyn BookingStore>,
}

impl StatisticsEngine {
    pub fn new(courts: Arc<dyn CourtStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self { courts, bookings }
    }

    /// Statistics for the given month, defaulting to the court's current one.
    ///
    /// Revenue is restricted: only admins and the court's owner may read it.
    ///
    /// # Errors
    /// `CourtNotFound`, `Forbidden`, or `ConfigInvalid` for a bad month.
    pub fn compute_monthly(
        &self,
        actor: &Actor,
        court_id: CourtId,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<MonthlyStats> {
        self.compute_monthly_at(actor, court_id, year, month, Utc::now())
    }

    /// Like [`compute_monthly`](Self::compute_monthly) with an explicit clock.
    pub fn compute_monthly_at(
        &self,
        actor: &Actor,
        court_id: CourtId,
        year: Option<i32>,
        month: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<MonthlyStats> {
        let court = self
            .courts
            .find_with_rules_for_stats(court_id)?
            .ok_or(BookingError::CourtNotFound(court_id))?;
        if !actor.can_manage(&court) {
            warn!(court_id, user_id = actor.user_id, "statistics access forbidden");
            return Err(BookingError::Forbidden(format!(
                "statistics of court {court_id} are restricted to its owner"
            )));
        }
        let tz = court.tz()?;
        let (year, month) = resolve_period(&tz, year, month, now)?;
        let window = MonthWindow::new(&tz, year, month)?;

        let bookings = self.bookings.find_in_range(court.id, window.start, window.end)?;
        let stats = monthly_stats(&court, year, month, &bookings)?;

        info!(
            court_id,
            year,
            month,
            bookings = stats.booking_count,
            occupancy = stats.occupancy_rate,
            "monthly statistics computed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn buckets_split_at_hour_boundaries() {
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let mut buckets = [0i64; 24];
        // 08:15-09:45 local on a half-hour offset zone.
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 2, 45, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 3, 4, 15, 0).unwrap();
        add_to_buckets(&mut buckets, &tz, start, end);
        assert_eq!(buckets[8], 45 * 60);
        assert_eq!(buckets[9], 45 * 60);
        assert_eq!(buckets.iter().sum::<i64>(), 90 * 60);
    }

    #[test]
    fn window_covers_local_month() {
        let tz: Tz = "Asia/Ho_Chi_Minh".parse().unwrap();
        let window = MonthWindow::new(&tz, 2024, 12).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 11, 30, 17, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 12, 31, 17, 0, 0).unwrap());
        assert_eq!(window.days().count(), 31);
        assert!(MonthWindow::new(&tz, 2024, 13).is_err());
        assert!(MonthWindow::new(&tz, 2024, 0).is_err());
    }

    #[test]
    fn missing_month_defaults_from_local_date() {
        let tz: Tz = "Asia/Ho_Chi_Minh".parse().unwrap();
        // Already 1 January locally.
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 18, 0, 0).unwrap();
        assert_eq!(resolve_period(&tz, None, None, now).unwrap(), (2025, 1));
        assert_eq!(resolve_period(&tz, Some(2023), None, now).unwrap(), (2023, 1));
        assert_eq!(resolve_period(&tz, None, Some(5), now).unwrap(), (2025, 5));
        assert!(resolve_period(&tz, None, Some(13), now).is_err());
    }
}
