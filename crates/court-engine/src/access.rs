//! Caller identity and role-based visibility.
//!
//! Each role maps to one visibility scope per resource, so permission checks
//! are a lookup rather than branching spread across operations.

use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::court::Court;

pub type UserId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Books courts; sees only their own bookings and active courts.
    User,
    /// Owns courts; sees bookings on the courts they own.
    CourtOwner,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "owner" | "court_owner" | "master" => Ok(Role::CourtOwner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn booking_scope(&self) -> BookingScope {
        match self.role {
            Role::User => BookingScope::OwnBookings(self.user_id),
            Role::CourtOwner => BookingScope::OwnedCourts(self.user_id),
            Role::Admin => BookingScope::Everything,
        }
    }

    pub fn court_scope(&self) -> CourtScope {
        match self.role {
            Role::User => CourtScope {
                owner_id: None,
                active_only: true,
            },
            Role::CourtOwner => CourtScope {
                owner_id: Some(self.user_id),
                active_only: false,
            },
            Role::Admin => CourtScope::default(),
        }
    }

    /// Whether the actor may manage the court's configuration.
    pub fn can_manage(&self, court: &Court) -> bool {
        match self.role {
            Role::Admin => true,
            Role::CourtOwner => court.owner_id == self.user_id,
            Role::User => false,
        }
    }
}

/// Which bookings an actor may see or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    OwnBookings(UserId),
    OwnedCourts(UserId),
    Everything,
}

impl BookingScope {
    /// `court` is the booking's court, needed for the owner check.
    pub fn permits(&self, booking: &Booking, court: Option<&Court>) -> bool {
        match *self {
            BookingScope::OwnBookings(user_id) => booking.user_id == user_id,
            BookingScope::OwnedCourts(owner_id) => court.is_some_and(|c| {
                c.id == booking.court_id && c.owner_id == owner_id
            }),
            BookingScope::Everything => true,
        }
    }
}

/// Filter applied to court lookups and listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CourtScope {
    pub owner_id: Option<UserId>,
    pub active_only: bool,
}

impl CourtScope {
    pub fn permits(&self, court: &Court) -> bool {
        self.owner_id.is_none_or(|owner| court.owner_id == owner)
            && (!self.active_only || court.active)
    }
}
