//! Court administration and the per-court schedule view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::{Actor, Role};
use crate::booking::{self, Booking};
use crate::conflict;
use crate::court::{BusinessHourRule, Court, CourtId, CourtPatch, NewCourt};
use crate::error::{BookingError, Result};
use crate::store::{BookingStore, CourtStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Free,
    Occupied,
}

/// Non-cancelled bookings of an active court intersecting `[from, to)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourtSchedule {
    pub court_id: CourtId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub status: SlotStatus,
    pub bookings: Vec<Booking>,
}

/// Upper bound on `CourtQuery::limit`.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Court listing filter. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtQuery {
    /// Case-insensitive substring of the court's location. Blank means any.
    pub location: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for CourtQuery {
    fn default() -> Self {
        Self {
            location: None,
            page: 1,
            limit: 10,
        }
    }
}

impl CourtQuery {
    fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(BookingError::ConfigInvalid("page starts at 1".to_string()));
        }
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(BookingError::ConfigInvalid(format!(
                "limit must be 1..={MAX_PAGE_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }

    fn matches(&self, court: &Court) -> bool {
        let needle = match self.location.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => needle.to_lowercase(),
            _ => return true,
        };
        court
            .location
            .as_deref()
            .is_some_and(|location| location.to_lowercase().contains(&needle))
    }
}

/// One page of a court listing, newest courts first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourtPage {
    pub items: Vec<Court>,
    /// Matching courts across all pages.
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: usize,
}

pub struct CourtAdmin {
    courts: Arc<dyn CourtStore>,
    bookings: Arc<dyn BookingStore>,
}

impl CourtAdmin {
    pub fn new(courts: Arc<dyn CourtStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self { courts, bookings }
    }

    /// Create a court owned by the acting user.
    ///
    /// # Errors
    /// `Forbidden` for plain users, `InvalidTimezone` or `ConfigInvalid` for
    /// a bad configuration.
    pub fn create_court(&self, actor: &Actor, court: NewCourt) -> Result<Court> {
        if actor.role == Role::User {
            return Err(BookingError::Forbidden(
                "only court owners can create courts".to_string(),
            ));
        }
        court.clone().into_court(0, actor.user_id).validate()?;

        let created = self.courts.create_court(court, actor.user_id)?;
        info!(
            court_id = created.id,
            owner_id = created.owner_id,
            timezone = %created.timezone,
            "court created"
        );
        Ok(created)
    }

    /// Change name, zone, default hours, price or descriptive fields.
    ///
    /// Stored bookings keep the price they were created with.
    ///
    /// # Errors
    /// `Forbidden` unless admin or the court's owner; `InvalidTimezone` or
    /// `ConfigInvalid` when the patched court is invalid, in which case
    /// nothing is written.
    pub fn update_court(
        &self,
        actor: &Actor,
        court_id: CourtId,
        patch: CourtPatch,
    ) -> Result<Court> {
        let mut court = self.managed_court(actor, court_id)?;
        if patch.is_empty() {
            return Ok(court);
        }
        patch.apply_to(&mut court);
        court.validate()?;

        let updated = self.courts.update_court(&court)?;
        info!(
            court_id,
            price_per_hour = %updated.price_per_hour,
            timezone = %updated.timezone,
            "court updated"
        );
        Ok(updated)
    }

    /// Create or replace the rule for `rule.day_of_week`.
    pub fn set_business_hours(
        &self,
        actor: &Actor,
        court_id: CourtId,
        rule: BusinessHourRule,
    ) -> Result<Court> {
        let mut court = self.managed_court(actor, court_id)?;
        let weekday = rule.day_of_week;
        court.upsert_rule(rule)?;
        let updated = self.courts.update_court(&court)?;
        info!(court_id, weekday, "business hours set");
        Ok(updated)
    }

    /// Drop the rule for `weekday`; the day falls back to default hours.
    /// Returns whether a rule existed.
    pub fn remove_business_hours(
        &self,
        actor: &Actor,
        court_id: CourtId,
        weekday: u8,
    ) -> Result<bool> {
        let mut court = self.managed_court(actor, court_id)?;
        if !court.remove_rule(weekday) {
            return Ok(false);
        }
        self.courts.update_court(&court)?;
        info!(court_id, weekday, "business hours removed");
        Ok(true)
    }

    /// Soft delete: the court stops taking bookings and disappears from user
    /// listings. Its bookings are kept.
    pub fn deactivate_court(&self, actor: &Actor, court_id: CourtId) -> Result<Court> {
        let mut court = self.managed_court(actor, court_id)?;
        court.active = false;
        let updated = self.courts.update_court(&court)?;
        info!(court_id, "court deactivated");
        Ok(updated)
    }

    /// A court visible to the actor; invisible courts are reported missing.
    pub fn get_court(&self, actor: &Actor, court_id: CourtId) -> Result<Court> {
        self.courts
            .find_by_id(court_id)?
            .filter(|court| actor.court_scope().permits(court))
            .ok_or(BookingError::CourtNotFound(court_id))
    }

    /// Courts visible to the actor matching `query`, one page at a time.
    pub fn list_courts(&self, actor: &Actor, query: &CourtQuery) -> Result<CourtPage> {
        query.validate()?;

        let mut courts: Vec<Court> = self
            .courts
            .list_courts(&actor.court_scope())?
            .into_iter()
            .filter(|court| query.matches(court))
            .collect();
        courts.sort_by(|a, b| b.id.cmp(&a.id));

        let total = courts.len();
        let limit = query.limit as usize;
        let items = courts
            .into_iter()
            .skip((query.page as usize - 1) * limit)
            .take(limit)
            .collect();
        Ok(CourtPage {
            items,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// # Errors
    /// `InvalidInterval` for malformed or empty ranges, `CourtNotFound` or
    /// `CourtInactive`.
    pub fn court_schedule(&self, court_id: CourtId, from: &str, to: &str) -> Result<CourtSchedule> {
        let from = booking::parse_instant(from)?;
        let to = booking::parse_instant(to)?;
        conflict::check_interval(from, to)?;

        let court = match self.courts.find_active_by_id(court_id)? {
            Some(court) => court,
            None if self.courts.find_by_id(court_id)?.is_some() => {
                return Err(BookingError::CourtInactive(court_id))
            }
            None => return Err(BookingError::CourtNotFound(court_id)),
        };

        let mut bookings = self.bookings.find_overlapping(court.id, from, to)?;
        bookings.sort_by_key(|b| (b.start_time, b.id));
        let status = if bookings.is_empty() {
            SlotStatus::Free
        } else {
            SlotStatus::Occupied
        };
        Ok(CourtSchedule {
            court_id,
            from,
            to,
            status,
            bookings,
        })
    }

    fn managed_court(&self, actor: &Actor, court_id: CourtId) -> Result<Court> {
        let court = self
            .courts
            .find_by_id(court_id)?
            .ok_or(BookingError::CourtNotFound(court_id))?;
        if !actor.can_manage(&court) {
            warn!(court_id, user_id = actor.user_id, "court management forbidden");
            return Err(BookingError::Forbidden(format!(
                "court {court_id} is not managed by user {}",
                actor.user_id
            )));
        }
        Ok(court)
    }
}
