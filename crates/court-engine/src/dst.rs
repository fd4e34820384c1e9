//! DST transition policies and local wall-clock → instant conversion.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Policy for local times that fall in a DST gap (e.g. 02:30 during spring forward).
///
/// Ambiguous times (fall back) always resolve to the earliest instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Nonexistent local times have no instant.
    Skip,
    /// Move to the first valid local time after the gap.
    #[default]
    ShiftForward,
    /// Keep the wall-clock reading using the offset in force before the gap.
    WallClock,
}

/// Convert a local wall-clock time in `tz` to an instant.
///
/// Returns `None` only under [`DstPolicy::Skip`] for a nonexistent local time.
pub fn localize(tz: &Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => (1..=48 * 60).find_map(|minutes| {
                tz.from_local_datetime(&(local + Duration::minutes(minutes)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
            DstPolicy::WallClock => {
                let before = tz
                    .offset_from_utc_datetime(&(local - Duration::days(1)))
                    .fix();
                let utc = local - Duration::seconds(i64::from(before.local_minus_utc()));
                Some(Utc.from_utc_datetime(&utc))
            }
        },
    }
}

/// The instant at `minute_of_day` on local `date`. Minute 1440 is the next
/// local midnight.
pub fn at_minute(
    tz: &Tz,
    date: NaiveDate,
    minute_of_day: u32,
    policy: DstPolicy,
) -> Option<DateTime<Utc>> {
    let local = date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(minute_of_day));
    localize(tz, local, policy)
}

/// `[start, end)` of local `date` as instants. Usually 24 hours long; 23 or
/// 25 on DST transition days.
pub fn day_bounds(tz: &Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = at_minute(tz, date, 0, DstPolicy::ShiftForward);
    let end = at_minute(tz, date, 24 * 60, DstPolicy::ShiftForward);
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        // ShiftForward always resolves within two days of any real zone's gap.
        _ => {
            let naive = date.and_time(NaiveTime::MIN).and_utc();
            (naive, naive + Duration::days(1))
        }
    }
}
