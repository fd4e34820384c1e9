//! Court configuration: time zone, default hours, per-weekday overrides.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::access::UserId;
use crate::error::{BookingError, Result};

pub type CourtId = u64;

/// Minute-of-day for the end of a local day. Valid as a close time only.
pub const END_OF_DAY: u16 = 24 * 60;

/// A per-weekday exception to a court's default hours.
///
/// Weekdays are numbered 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHourRule {
    pub day_of_week: u8,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub open_time: Option<u16>,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub close_time: Option<u16>,
}

impl BusinessHourRule {
    pub fn open(day_of_week: u8, open_time: u16, close_time: u16) -> Self {
        Self {
            day_of_week,
            is_closed: false,
            open_time: Some(open_time),
            close_time: Some(close_time),
        }
    }

    pub fn closed(day_of_week: u8) -> Self {
        Self {
            day_of_week,
            is_closed: true,
            open_time: None,
            close_time: None,
        }
    }

    /// Check the rule's write-time invariants: weekday in 0..=6 and, unless
    /// closed, both times present with `open < close`.
    pub fn validate(&self) -> Result<()> {
        if self.day_of_week > 6 {
            return Err(BookingError::ConfigInvalid(format!(
                "day_of_week must be 0..=6, got {}",
                self.day_of_week
            )));
        }
        if self.is_closed {
            return Ok(());
        }
        match (self.open_time, self.close_time) {
            (Some(open), Some(close)) => check_window(open, close),
            _ => Err(BookingError::ConfigInvalid(
                "open_time and close_time are required unless the day is closed".to_string(),
            )),
        }
    }
}

/// A bookable court.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Court {
    pub id: CourtId,
    pub owner_id: UserId,
    pub name: String,
    /// IANA time zone name, e.g. `Asia/Ho_Chi_Minh`.
    pub timezone: String,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub default_open_time: Option<u16>,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub default_close_time: Option<u16>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub price_per_hour: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// At most one rule per weekday, kept sorted by weekday.
    #[serde(default)]
    pub business_hours: Vec<BusinessHourRule>,
}

fn default_active() -> bool {
    true
}

impl Court {
    /// Parse the court's time zone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| BookingError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn rule_for(&self, weekday: u8) -> Option<&BusinessHourRule> {
        self.business_hours.iter().find(|r| r.day_of_week == weekday)
    }

    /// Insert the rule for its weekday, replacing any existing one.
    pub fn upsert_rule(&mut self, rule: BusinessHourRule) -> Result<()> {
        rule.validate()?;
        match self
            .business_hours
            .iter_mut()
            .find(|r| r.day_of_week == rule.day_of_week)
        {
            Some(existing) => *existing = rule,
            None => {
                self.business_hours.push(rule);
                self.business_hours.sort_by_key(|r| r.day_of_week);
            }
        }
        Ok(())
    }

    /// Drop the rule for `weekday`. Returns whether one existed.
    pub fn remove_rule(&mut self, weekday: u8) -> bool {
        let before = self.business_hours.len();
        self.business_hours.retain(|r| r.day_of_week != weekday);
        self.business_hours.len() != before
    }

    /// Validate the whole configuration: zone, default hours and rules.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if let (Some(open), Some(close)) = (self.default_open_time, self.default_close_time) {
            check_window(open, close)?;
        }
        if self.price_per_hour.is_sign_negative() {
            return Err(BookingError::ConfigInvalid(
                "price_per_hour must not be negative".to_string(),
            ));
        }
        let mut seen = [false; 7];
        for rule in &self.business_hours {
            rule.validate()?;
            let slot = &mut seen[rule.day_of_week as usize];
            if *slot {
                return Err(BookingError::ConfigInvalid(format!(
                    "duplicate business hours for weekday {}",
                    rule.day_of_week
                )));
            }
            *slot = true;
        }
        Ok(())
    }
}

/// Input for registering a court. The owner is the acting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourt {
    pub name: String,
    pub timezone: String,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub default_open_time: Option<u16>,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub default_close_time: Option<u16>,
    pub price_per_hour: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub business_hours: Vec<BusinessHourRule>,
}

impl NewCourt {
    pub fn into_court(self, id: CourtId, owner_id: UserId) -> Court {
        let mut business_hours = self.business_hours;
        business_hours.sort_by_key(|r| r.day_of_week);
        Court {
            id,
            owner_id,
            name: self.name,
            timezone: self.timezone,
            default_open_time: self.default_open_time,
            default_close_time: self.default_close_time,
            active: true,
            price_per_hour: self.price_per_hour,
            location: self.location,
            description: self.description,
            business_hours,
        }
    }
}

/// Partial update of a court's configuration. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtPatch {
    pub name: Option<String>,
    pub timezone: Option<String>,
    #[serde(with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub default_open_time: Option<u16>,
    #[serde(with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub default_close_time: Option<u16>,
    pub price_per_hour: Option<Decimal>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl CourtPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the set fields onto `court`. Validation is left to the caller.
    pub fn apply_to(self, court: &mut Court) {
        if let Some(name) = self.name {
            court.name = name;
        }
        if let Some(timezone) = self.timezone {
            court.timezone = timezone;
        }
        if let Some(open) = self.default_open_time {
            court.default_open_time = Some(open);
        }
        if let Some(close) = self.default_close_time {
            court.default_close_time = Some(close);
        }
        if let Some(price) = self.price_per_hour {
            court.price_per_hour = price;
        }
        if self.location.is_some() {
            court.location = self.location;
        }
        if self.description.is_some() {
            court.description = self.description;
        }
    }
}

fn check_window(open: u16, close: u16) -> Result<()> {
    if open >= END_OF_DAY || close > END_OF_DAY {
        return Err(BookingError::ConfigInvalid(format!(
            "hours out of range: {} - {}",
            hhmm::format(open),
            hhmm::format(close)
        )));
    }
    if open >= close {
        return Err(BookingError::ConfigInvalid(format!(
            "open time {} must be before close time {}",
            hhmm::format(open),
            hhmm::format(close)
        )));
    }
    Ok(())
}

/// `"HH:MM"` <-> minute-of-day. `"24:00"` is accepted as end of day.
pub mod hhmm {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::END_OF_DAY;

    pub fn parse(s: &str) -> Option<u16> {
        let (h, m) = s.trim().split_once(':')?;
        if h.len() != 2 || m.len() != 2 {
            return None;
        }
        let h: u16 = h.parse().ok()?;
        let m: u16 = m.parse().ok()?;
        if m >= 60 {
            return None;
        }
        let minute = h * 60 + m;
        (minute <= END_OF_DAY).then_some(minute)
    }

    pub fn format(minute: u16) -> String {
        format!("{:02}:{:02}", minute / 60, minute % 60)
    }

    pub fn serialize<S: Serializer>(minute: &u16, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(*minute))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid HH:MM time: {raw}")))
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(minute: &Option<u16>, s: S) -> Result<S::Ok, S::Error> {
            match minute {
                Some(m) => super::serialize(m, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| {
                    super::parse(&raw).ok_or_else(|| {
                        serde::de::Error::custom(format!("invalid HH:MM time: {raw}"))
                    })
                })
                .transpose()
        }
    }
}
