//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use court_engine::store::Snapshot;
use court_engine::{
    Actor, Booking, BookingScheduler, BookingStatus, BookingType, Court, MemoryStore, Role,
};
use rust_decimal::Decimal;

pub const OWNER: u64 = 10;
pub const OTHER_OWNER: u64 = 11;
pub const ALICE: u64 = 20;
pub const BOB: u64 = 21;

/// Ho Chi Minh City court, open 06:00-22:00 every day, 100,000 per hour.
pub fn hcm_court() -> Court {
    Court {
        id: 1,
        owner_id: OWNER,
        name: "Court A".into(),
        timezone: "Asia/Ho_Chi_Minh".into(),
        default_open_time: Some(6 * 60),
        default_close_time: Some(22 * 60),
        active: true,
        price_per_hour: Decimal::from(100_000),
        location: Some("District 1, Ho Chi Minh City".into()),
        description: None,
        business_hours: Vec::new(),
    }
}

pub fn store_with(courts: Vec<Court>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_snapshot(Snapshot {
        courts,
        bookings: Vec::new(),
    }))
}

pub fn scheduler(store: &Arc<MemoryStore>) -> BookingScheduler {
    BookingScheduler::new(store.clone(), store.clone())
}

pub fn user(id: u64) -> Actor {
    Actor::new(id, Role::User)
}

pub fn owner(id: u64) -> Actor {
    Actor::new(id, Role::CourtOwner)
}

pub fn admin() -> Actor {
    Actor::new(1, Role::Admin)
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// A stored booking built directly, bypassing admission.
pub fn booking(
    id: u64,
    court_id: u64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    price: i64,
    status: BookingStatus,
) -> Booking {
    Booking {
        id,
        user_id: ALICE,
        court_id,
        start_time: start,
        end_time: end,
        total_price: Decimal::from(price),
        notes: None,
        booking_type: BookingType::Casual,
        status,
        created_at: start,
    }
}
