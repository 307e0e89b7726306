//! Data types produced by the derivation pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;

/// Ignition as far as the dashboard can tell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ignition {
    On,
    Off,
    #[default]
    Unknown,
}

impl Ignition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Ignition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized per-device state, rebuilt on every status fetch.
///
/// `is_idling` implies `ignition == On` and `!is_driving`. A device that is
/// not communicating is always `{Unknown, false, false}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VehicleState {
    pub ignition: Ignition,
    pub is_driving: bool,
    pub is_idling: bool,
}

/// UTC bounds of one civil day in a timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub timezone: Tz,
    pub day: NaiveDate,
    /// First instant of the local day.
    pub from: DateTime<Utc>,
    /// One millisecond before the next local day starts.
    pub to: DateTime<Utc>,
}

impl DayWindow {
    /// Wall-clock length of the day: 24h normally, 23h or 25h on DST days.
    pub fn length(&self) -> chrono::Duration {
        self.to - self.from + chrono::Duration::milliseconds(1)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }
}

/// Distance travelled per device during one `(timezone, day)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyDistance {
    pub timezone: Tz,
    pub day: NaiveDate,
    pub totals: HashMap<String, f64>,
}

impl DailyDistance {
    pub fn distance_for(&self, device_id: &str) -> Option<f64> {
        self.totals.get(device_id).copied()
    }

    pub fn is_for(&self, window: &DayWindow) -> bool {
        self.timezone == window.timezone && self.day == window.day
    }
}
