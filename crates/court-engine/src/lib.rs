//! # court-engine
//!
//! Availability and scheduling core for court bookings.
//!
//! Resolves a court's effective hours on any local date, admits or rejects
//! candidate intervals without double-booking, expands weekly recurring
//! bookings into time-zone-correct occurrences committed all-or-nothing, and
//! aggregates monthly occupancy statistics. Storage is reached through the
//! [`store::CourtStore`] and [`store::BookingStore`] ports.
//!
//! ## Modules
//!
//! - [`hours`] - effective open window of a court on a local date
//! - [`conflict`] - admission checks: interval, court state, hours, overlap
//! - [`expander`] - weekly recurrence → concrete candidate intervals
//! - [`scheduler`] - single and recurring booking, cancellation, queries
//! - [`stats`] - monthly booked hours, occupancy, revenue, peak hours
//! - [`courts`] - court administration and schedule view
//! - [`dst`] - local wall-clock → instant conversion policies
//! - [`access`] - roles and visibility scopes
//! - [`store`] - storage ports and an in-memory implementation
//! - [`config`] - engine limits
//! - [`error`] - Error types

pub mod access;
pub mod booking;
pub mod config;
pub mod conflict;
pub mod court;
pub mod courts;
pub mod dst;
pub mod error;
pub mod expander;
pub mod hours;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use access::{Actor, Role};
pub use booking::{Booking, BookingStatus, BookingType};
pub use config::SchedulerLimits;
pub use conflict::ConflictDetector;
pub use court::{BusinessHourRule, Court, CourtPatch, NewCourt};
pub use courts::{CourtAdmin, CourtPage, CourtQuery};
pub use error::{BookingError, Result};
pub use expander::{expand, RecurrenceSpec};
pub use hours::{resolve, DayHours};
pub use scheduler::{BookingScheduler, CreateBooking, CreateFixedBooking, FixedBookingOutcome};
pub use stats::{MonthlyStats, StatisticsEngine};
pub use store::{BookingStore, CourtStore, MemoryStore};
