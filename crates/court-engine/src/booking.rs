//! Booking records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::access::UserId;
use crate::court::CourtId;
use crate::error::BookingError;

pub type BookingId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    /// Terminal.
    Cancelled,
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingType {
    /// One-off booking.
    Casual,
    /// Generated from a weekly recurrence.
    Monthly,
}

/// A reservation of `[start_time, end_time)` on a court.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub court_id: CourtId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Fixed at creation; later rate changes do not touch it.
    pub total_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "type")]
    pub booking_type: BookingType,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Half-open overlap with `[start, end)`. Touching intervals do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// A booking that has passed admission but has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: UserId,
    pub court_id: CourtId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub booking_type: BookingType,
    pub status: BookingStatus,
}

impl NewBooking {
    pub fn into_booking(self, id: BookingId, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            court_id: self.court_id,
            start_time: self.start_time,
            end_time: self.end_time,
            total_price: self.total_price,
            notes: self.notes,
            booking_type: self.booking_type,
            status: self.status,
            created_at,
        }
    }
}

/// Parse an RFC 3339 timestamp into a UTC instant.
///
/// # Errors
/// `InvalidInterval` when the text is not a valid timestamp.
pub fn parse_instant(text: &str) -> crate::error::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BookingError::InvalidInterval(format!("malformed timestamp {text:?}: {e}")))
}

/// `price_per_hour × (end - start)` in hours, exact to the second.
pub fn price_for(price_per_hour: Decimal, start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let seconds = Decimal::from((end - start).num_seconds());
    (price_per_hour * seconds / Decimal::from(3600)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn price_is_exact_for_fractional_hours() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 1, 0, 0).unwrap();
        let two_hours = Utc.with_ymd_and_hms(2024, 6, 3, 3, 0, 0).unwrap();
        let ninety_min = Utc.with_ymd_and_hms(2024, 6, 3, 2, 30, 0).unwrap();
        let rate = Decimal::from(100_000);
        assert_eq!(price_for(rate, start, two_hours), Decimal::from(200_000));
        assert_eq!(price_for(rate, start, ninety_min), Decimal::from(150_000));
    }

    #[test]
    fn status_parses_both_spellings() {
        assert_eq!("Canceled".parse::<BookingStatus>(), Ok(BookingStatus::Cancelled));
        assert_eq!("pending".parse::<BookingStatus>(), Ok(BookingStatus::Pending));
        assert!("done".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn timestamps_normalize_to_utc() {
        let instant = parse_instant("2024-06-03T08:00:00+07:00").unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 6, 3, 1, 0, 0).unwrap());
        assert!(matches!(
            parse_instant("2024-06-03 08:00"),
            Err(BookingError::InvalidInterval(_))
        ));
    }
}
