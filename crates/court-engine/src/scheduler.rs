//! Booking creation, cancellation and visibility-scoped reads.
//!
//! Every request moves `validated -> admitted -> committed` or stops at the
//! first rejection. Admission and the insert that follows it run inside the
//! court's critical section, so two overlapping requests on one court cannot
//! both pass the conflict check. Recurring requests hold the section across
//! every candidate check and the batch insert.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::access::{Actor, BookingScope, CourtScope};
use crate::booking::{self, Booking, BookingId, BookingStatus, BookingType, NewBooking};
use crate::config::SchedulerLimits;
use crate::conflict::{self, CandidateKind, ConflictDetector};
use crate::court::{Court, CourtId};
use crate::error::{BookingError, Result};
use crate::expander::{self, RecurrenceSpec};
use crate::store::{BookingQuery, BookingStore, CourtStore};

/// A one-off booking request. Timestamps are RFC 3339 with any offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBooking {
    pub court_id: CourtId,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A weekly recurring booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFixedBooking {
    pub court_id: CourtId,
    #[serde(flatten)]
    pub recurrence: RecurrenceSpec,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The committed batch of a recurring request, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedBookingOutcome {
    pub count: usize,
    pub bookings: Vec<Booking>,
}

/// One mutex per court, created on first use.
#[derive(Debug, Default)]
struct CourtLocks {
    locks: Mutex<HashMap<CourtId, Arc<Mutex<()>>>>,
}

impl CourtLocks {
    fn handle(&self, court_id: CourtId) -> Arc<Mutex<()>> {
        // The map only ever grows; a panic while holding it cannot leave it
        // inconsistent.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(court_id).or_default())
    }
}

pub struct BookingScheduler {
    courts: Arc<dyn CourtStore>,
    bookings: Arc<dyn BookingStore>,
    limits: SchedulerLimits,
    locks: CourtLocks,
}

impl BookingScheduler {
    pub fn new(courts: Arc<dyn CourtStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self {
            courts,
            bookings,
            limits: SchedulerLimits::default(),
            locks: CourtLocks::default(),
        }
    }

    pub fn with_limits(mut self, limits: SchedulerLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &SchedulerLimits {
        &self.limits
    }

    /// Book `[start_time, end_time)` for the acting user with status Pending.
    ///
    /// # Errors
    /// `InvalidInterval`, `CourtNotFound`, `CourtInactive`,
    /// `MissingHoursConfig`, `OutsideBusinessHours` or `Overlap`; storage
    /// failures surface as `OperationFailed`.
    pub fn create_once(&self, actor: &Actor, request: CreateBooking) -> Result<Booking> {
        self.try_create_once(actor, request).inspect_err(|err| {
            warn!(user_id = actor.user_id, kind = err.kind(), error = %err, "booking rejected");
        })
    }

    fn try_create_once(&self, actor: &Actor, request: CreateBooking) -> Result<Booking> {
        let start = booking::parse_instant(&request.start_time)?;
        let end = booking::parse_instant(&request.end_time)?;
        conflict::check_interval(start, end)?;
        let court = self.load_court(request.court_id)?;
        debug!(court_id = court.id, %start, %end, "booking validated");

        let lock = self.locks.handle(court.id);
        let _section = lock.lock().unwrap_or_else(PoisonError::into_inner);

        ConflictDetector::new(self.bookings.as_ref()).check_admissible(
            &court,
            start,
            end,
            CandidateKind::Single,
        )?;
        debug!(court_id = court.id, %start, %end, "booking admitted");

        let booking = self.bookings.create_one(NewBooking {
            user_id: actor.user_id,
            court_id: court.id,
            start_time: start,
            end_time: end,
            total_price: booking::price_for(court.price_per_hour, start, end),
            notes: request.notes,
            booking_type: BookingType::Casual,
            status: BookingStatus::Pending,
        })?;

        info!(
            booking_id = booking.id,
            court_id = booking.court_id,
            user_id = booking.user_id,
            total_price = %booking.total_price,
            "booking committed"
        );
        Ok(booking)
    }

    /// Expand a weekly pattern and book every occurrence, or none of them.
    ///
    /// # Errors
    /// `ConfigInvalid` for bad recurrence parameters. A rejected candidate is
    /// reported as `Occurrence` naming its week and weekday, wrapping the
    /// admission failure; nothing is written in that case.
    pub fn create_fixed(
        &self,
        actor: &Actor,
        request: CreateFixedBooking,
    ) -> Result<FixedBookingOutcome> {
        self.try_create_fixed(actor, request).inspect_err(|err| {
            warn!(
                user_id = actor.user_id,
                kind = err.kind(),
                error = %err,
                "recurring booking rejected"
            );
        })
    }

    fn try_create_fixed(
        &self,
        actor: &Actor,
        request: CreateFixedBooking,
    ) -> Result<FixedBookingOutcome> {
        let court = self.load_court(request.court_id)?;
        if !court.active {
            return Err(BookingError::CourtInactive(court.id));
        }
        let occurrences = expander::expand(&request.recurrence, &court.timezone, &self.limits)?;
        debug!(
            court_id = court.id,
            candidates = occurrences.len(),
            "recurring booking validated"
        );

        let lock = self.locks.handle(court.id);
        let _section = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let detector = ConflictDetector::new(self.bookings.as_ref());
        let mut batch = Vec::with_capacity(occurrences.len());
        for occurrence in &occurrences {
            let (start, end) = (occurrence.start, occurrence.end);
            detector
                .check_admissible(&court, start, end, CandidateKind::Recurring)
                .map_err(|reason| BookingError::Occurrence {
                    week: occurrence.week,
                    weekday: occurrence.weekday,
                    start,
                    end,
                    reason: Box::new(reason),
                })?;
            batch.push(NewBooking {
                user_id: actor.user_id,
                court_id: court.id,
                start_time: start,
                end_time: end,
                total_price: booking::price_for(court.price_per_hour, start, end),
                notes: request.notes.clone(),
                booking_type: BookingType::Monthly,
                status: BookingStatus::Pending,
            });
        }
        debug!(
            court_id = court.id,
            candidates = batch.len(),
            "recurring booking admitted"
        );

        let bookings = self.bookings.create_many_atomic(batch)?;
        info!(
            court_id = court.id,
            user_id = actor.user_id,
            count = bookings.len(),
            "recurring booking committed"
        );
        Ok(FixedBookingOutcome {
            count: bookings.len(),
            bookings,
        })
    }

    /// Move a visible booking to Cancelled.
    ///
    /// # Errors
    /// `BookingNotFound`, `Forbidden` outside the actor's scope, or
    /// `AlreadyCancelled`.
    pub fn cancel(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        let booking = self.visible_booking(actor, booking_id)?;
        if booking.is_cancelled() {
            warn!(booking_id, user_id = actor.user_id, "cancel rejected: already cancelled");
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let cancelled = self.bookings.update_status(booking_id, BookingStatus::Cancelled)?;
        info!(
            booking_id,
            court_id = cancelled.court_id,
            user_id = actor.user_id,
            "booking cancelled"
        );
        Ok(cancelled)
    }

    pub fn get_detail(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        self.visible_booking(actor, booking_id)
    }

    /// Bookings in the actor's scope, newest first, optionally by status.
    pub fn get_my_bookings(
        &self,
        actor: &Actor,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        let mut query = BookingQuery {
            status,
            ..BookingQuery::default()
        };
        match actor.booking_scope() {
            BookingScope::OwnBookings(user_id) => query.user_id = Some(user_id),
            BookingScope::OwnedCourts(owner_id) => {
                let owned = self.courts.list_courts(&CourtScope {
                    owner_id: Some(owner_id),
                    active_only: false,
                })?;
                query.court_ids = Some(owned.iter().map(|c| c.id).collect());
            }
            BookingScope::Everything => {}
        }
        Ok(self.bookings.query_bookings(&query)?)
    }

    fn load_court(&self, court_id: CourtId) -> Result<Court> {
        self.courts
            .find_by_id(court_id)?
            .ok_or(BookingError::CourtNotFound(court_id))
    }

    fn visible_booking(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        let booking = self
            .bookings
            .find_booking(booking_id)?
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        let scope = actor.booking_scope();
        let court = match scope {
            BookingScope::OwnedCourts(_) => self.courts.find_by_id(booking.court_id)?,
            _ => None,
        };
        if !scope.permits(&booking, court.as_ref()) {
            warn!(
                booking_id,
                user_id = actor.user_id,
                role = ?actor.role,
                "booking access forbidden"
            );
            return Err(BookingError::Forbidden(format!(
                "booking {booking_id} is outside your scope"
            )));
        }
        Ok(booking)
    }
}
