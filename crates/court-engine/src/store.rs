//! Storage collaborator ports and an in-memory implementation.
//!
//! The engine only talks to [`CourtStore`] and [`BookingStore`]. Implementations
//! must make [`BookingStore::create_many_atomic`] all-or-nothing and should
//! enforce an exclusion constraint on `(court, interval)` for non-cancelled
//! bookings, reporting violations as [`StoreError::Conflict`].

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::{CourtScope, UserId};
use crate::booking::{Booking, BookingId, BookingStatus, NewBooking};
use crate::court::{Court, CourtId, NewCourt};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("exclusion constraint violated on court {court_id} for {start} - {end}")]
    Conflict {
        court_id: CourtId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("record not found: {0}")]
    NotFound(String),

    /// Transient; the engine does not retry.
    #[error("storage call timed out")]
    Timeout,

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait CourtStore: Send + Sync {
    fn find_by_id(&self, id: CourtId) -> StoreResult<Option<Court>>;

    fn find_active_by_id(&self, id: CourtId) -> StoreResult<Option<Court>>;

    /// Court including its business-hour rules.
    fn find_with_rules_for_stats(&self, id: CourtId) -> StoreResult<Option<Court>>;

    fn list_courts(&self, scope: &CourtScope) -> StoreResult<Vec<Court>>;

    fn create_court(&self, court: NewCourt, owner_id: UserId) -> StoreResult<Court>;

    fn update_court(&self, court: &Court) -> StoreResult<Court>;
}

/// Filter for booking listings. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingQuery {
    pub user_id: Option<UserId>,
    pub court_ids: Option<Vec<CourtId>>,
    pub status: Option<BookingStatus>,
}

impl BookingQuery {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.user_id.is_none_or(|u| booking.user_id == u)
            && self
                .court_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&booking.court_id))
            && self.status.is_none_or(|s| booking.status == s)
    }
}

pub trait BookingStore: Send + Sync {
    fn find_booking(&self, id: BookingId) -> StoreResult<Option<Booking>>;

    /// Non-cancelled bookings on the court with `start_time < end && end_time > start`.
    fn find_overlapping(
        &self,
        court_id: CourtId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>>;

    fn create_one(&self, booking: NewBooking) -> StoreResult<Booking>;

    /// Insert every booking or none of them.
    fn create_many_atomic(&self, bookings: Vec<NewBooking>) -> StoreResult<Vec<Booking>>;

    fn update_status(&self, id: BookingId, status: BookingStatus) -> StoreResult<Booking>;

    /// Bookings of any status intersecting `[start, end)`.
    fn find_in_range(
        &self,
        court_id: CourtId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>>;

    /// Matching bookings, newest first.
    fn query_bookings(&self, query: &BookingQuery) -> StoreResult<Vec<Booking>>;
}

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub courts: Vec<Court>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

/// In-process store backed by a [`Snapshot`] behind a lock.
///
/// Inserts enforce the `(court, interval)` exclusion constraint.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json).map(Self::from_snapshot)
    }

    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        Ok(self.read()?.clone())
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(&*self.read()?)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    /// Add a court as-is, keeping its id.
    pub fn insert_court(&self, court: Court) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.courts.retain(|c| c.id != court.id);
        inner.courts.push(court);
        inner.courts.sort_by_key(|c| c.id);
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Snapshot>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Snapshot>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

fn next_booking_id(snapshot: &Snapshot) -> BookingId {
    snapshot.bookings.iter().map(|b| b.id).max().unwrap_or(0) + 1
}

fn violates_exclusion(existing: &[Booking], candidate: &NewBooking) -> bool {
    candidate.status != BookingStatus::Cancelled
        && existing.iter().any(|b| {
            b.court_id == candidate.court_id
                && !b.is_cancelled()
                && b.overlaps(candidate.start_time, candidate.end_time)
        })
}

fn conflict(candidate: &NewBooking) -> StoreError {
    StoreError::Conflict {
        court_id: candidate.court_id,
        start: candidate.start_time,
        end: candidate.end_time,
    }
}

impl CourtStore for MemoryStore {
    fn find_by_id(&self, id: CourtId) -> StoreResult<Option<Court>> {
        Ok(self.read()?.courts.iter().find(|c| c.id == id).cloned())
    }

    fn find_active_by_id(&self, id: CourtId) -> StoreResult<Option<Court>> {
        Ok(self
            .read()?
            .courts
            .iter()
            .find(|c| c.id == id && c.active)
            .cloned())
    }

    fn find_with_rules_for_stats(&self, id: CourtId) -> StoreResult<Option<Court>> {
        self.find_by_id(id)
    }

    fn list_courts(&self, scope: &CourtScope) -> StoreResult<Vec<Court>> {
        Ok(self
            .read()?
            .courts
            .iter()
            .filter(|c| scope.permits(c))
            .cloned()
            .collect())
    }

    fn create_court(&self, court: NewCourt, owner_id: UserId) -> StoreResult<Court> {
        let mut inner = self.write()?;
        let id = inner.courts.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let court = court.into_court(id, owner_id);
        inner.courts.push(court.clone());
        Ok(court)
    }

    fn update_court(&self, court: &Court) -> StoreResult<Court> {
        let mut inner = self.write()?;
        let slot = inner
            .courts
            .iter_mut()
            .find(|c| c.id == court.id)
            .ok_or_else(|| StoreError::NotFound(format!("court {}", court.id)))?;
        *slot = court.clone();
        Ok(court.clone())
    }
}

impl BookingStore for MemoryStore {
    fn find_booking(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        Ok(self.read()?.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn find_overlapping(
        &self,
        court_id: CourtId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .read()?
            .bookings
            .iter()
            .filter(|b| b.court_id == court_id && !b.is_cancelled() && b.overlaps(start, end))
            .cloned()
            .collect();
        found.sort_by_key(|b| (b.start_time, b.id));
        Ok(found)
    }

    fn create_one(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut inner = self.write()?;
        if violates_exclusion(&inner.bookings, &booking) {
            return Err(conflict(&booking));
        }
        let stored = booking.into_booking(next_booking_id(&inner), Utc::now());
        inner.bookings.push(stored.clone());
        Ok(stored)
    }

    fn create_many_atomic(&self, bookings: Vec<NewBooking>) -> StoreResult<Vec<Booking>> {
        let mut inner = self.write()?;
        let now = Utc::now();
        let first_id = next_booking_id(&inner);

        // Validate the whole batch against stored rows and itself before any write.
        let mut staged: Vec<Booking> = Vec::with_capacity(bookings.len());
        for (offset, booking) in bookings.into_iter().enumerate() {
            if violates_exclusion(&inner.bookings, &booking)
                || violates_exclusion(&staged, &booking)
            {
                return Err(conflict(&booking));
            }
            staged.push(booking.into_booking(first_id + offset as BookingId, now));
        }

        inner.bookings.extend(staged.iter().cloned());
        Ok(staged)
    }

    fn update_status(&self, id: BookingId, status: BookingStatus) -> StoreResult<Booking> {
        let mut inner = self.write()?;
        let booking = inner
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {id}")))?;
        booking.status = status;
        Ok(booking.clone())
    }

    fn find_in_range(
        &self,
        court_id: CourtId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .read()?
            .bookings
            .iter()
            .filter(|b| b.court_id == court_id && b.overlaps(start, end))
            .cloned()
            .collect();
        found.sort_by_key(|b| (b.start_time, b.id));
        Ok(found)
    }

    fn query_bookings(&self, query: &BookingQuery) -> StoreResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .read()?
            .bookings
            .iter()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }
}
