//! Error types for court-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::booking::BookingId;
use crate::court::CourtId;
use crate::store::StoreError;

/// A typed, user-facing rejection.
///
/// Every variant is recoverable. Storage failures never leak their detail
/// through `Display`: they are logged where they are wrapped and surface as
/// [`BookingError::OperationFailed`].
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Court {0} not found")]
    CourtNotFound(CourtId),

    #[error("Court {0} is not accepting bookings")]
    CourtInactive(CourtId),

    #[error("Court {court_id} has no business hours for weekday {weekday}")]
    MissingHoursConfig { court_id: CourtId, weekday: u8 },

    #[error("Slot {start} - {end} is outside business hours")]
    OutsideBusinessHours {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Slot {start} - {end} crosses local midnight")]
    CrossesMidnight {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Slot {start} - {end} overlaps an existing booking")]
    Overlap {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        /// The booking found in the way, when the detector saw it. `None` when
        /// the storage layer's exclusion constraint rejected the insert.
        existing: Option<BookingId>,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(BookingId),

    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// One occurrence of a recurring request was rejected; the whole batch was
    /// discarded.
    #[error("Week {week} occurrence on weekday {weekday} ({start} - {end}) rejected: {reason}")]
    Occurrence {
        week: u32,
        weekday: u8,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[source]
        reason: Box<BookingError>,
    },

    #[error("Operation failed")]
    OperationFailed,
}

impl BookingError {
    /// Stable machine-readable code for this rejection.
    ///
    /// An [`Occurrence`](BookingError::Occurrence) reports the code of the
    /// rejection it wraps.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::InvalidInterval(_) => "invalid_interval",
            BookingError::CourtNotFound(_) => "court_not_found",
            BookingError::CourtInactive(_) => "court_inactive",
            BookingError::MissingHoursConfig { .. } => "missing_hours_config",
            BookingError::OutsideBusinessHours { .. } => "outside_business_hours",
            BookingError::CrossesMidnight { .. } => "crosses_midnight",
            BookingError::Overlap { .. } => "overlap",
            BookingError::Forbidden(_) => "forbidden",
            BookingError::AlreadyCancelled(_) => "already_cancelled",
            BookingError::BookingNotFound(_) => "booking_not_found",
            BookingError::ConfigInvalid(_) => "config_invalid",
            BookingError::InvalidTimezone(_) => "invalid_timezone",
            BookingError::Occurrence { reason, .. } => reason.kind(),
            BookingError::OperationFailed => "operation_failed",
        }
    }

    /// The innermost rejection, unwrapping occurrence context.
    pub fn root(&self) -> &BookingError {
        match self {
            BookingError::Occurrence { reason, .. } => reason.root(),
            other => other,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { start, end, .. } => BookingError::Overlap {
                start,
                end,
                existing: None,
            },
            other => {
                tracing::error!(error = %other, "storage collaborator failed");
                BookingError::OperationFailed
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn occurrence_reports_inner_kind() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 3, 3, 0, 0).unwrap();
        let err = BookingError::Occurrence {
            week: 2,
            weekday: 1,
            start,
            end,
            reason: Box::new(BookingError::Overlap {
                start,
                end,
                existing: Some(7),
            }),
        };
        assert_eq!(err.kind(), "overlap");
        assert!(matches!(
            err.root(),
            BookingError::Overlap {
                existing: Some(7),
                ..
            }
        ));
        assert!(err.to_string().contains("Week 2"));
    }

    #[test]
    fn storage_failure_hides_detail() {
        let err: BookingError = StoreError::Backend("connection reset by peer".into()).into();
        assert_eq!(err.kind(), "operation_failed");
        assert!(!err.to_string().contains("connection"));
    }

    #[test]
    fn storage_conflict_becomes_overlap() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 3, 3, 0, 0).unwrap();
        let err: BookingError = StoreError::Conflict {
            court_id: 1,
            start,
            end,
        }
        .into();
        assert!(matches!(err, BookingError::Overlap { existing: None, .. }));
    }
}
