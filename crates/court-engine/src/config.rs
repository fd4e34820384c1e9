//! Engine limits, deserializable from any `serde` source.

use serde::{Deserialize, Serialize};

/// Bounds applied to recurring booking requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerLimits {
    pub max_weeks: u32,
    pub max_duration_hours: u32,
    pub max_start_hour: u32,
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            max_weeks: 52,
            max_duration_hours: 12,
            max_start_hour: 23,
        }
    }
}
