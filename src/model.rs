//! Fleet domain types as fetched from the telemetry API.
//!
//! These are snapshots: a roster or status list is replaced wholesale on every
//! fetch cycle and never patched in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked vehicle or asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub vin: Option<String>,
    pub serial_number: Option<String>,
    pub time_zone_id: Option<String>,
    pub license_plate: Option<String>,
    pub device_type: Option<String>,
    pub rate_plan_name: Option<String>,
    pub is_active_tracking_enabled: bool,
}

impl Device {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Most recent ignition diagnostic reading attached to a status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IgnitionDiagnostic {
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

/// Point-in-time telemetry for one device.
///
/// `Default` is the empty snapshot used for devices the status list did not
/// mention: not communicating, not driving, no fix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub device_id: String,
    pub is_communicating: bool,
    pub is_driving: bool,
    pub latitude: f64,
    pub longitude: f64,
    /// km/h
    pub speed: f64,
    /// Degrees, 0-359.
    pub bearing: f64,
    /// Meters.
    pub odometer: f64,
    pub last_update_at: Option<DateTime<Utc>>,
    pub ignition: Option<IgnitionDiagnostic>,
}

impl StatusSnapshot {
    pub fn empty(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            ..Default::default()
        }
    }

    /// `(0, 0)` is the API's sentinel for "no position fix".
    pub fn has_fix(&self) -> bool {
        has_fix(self.latitude, self.longitude)
    }
}

pub fn has_fix(latitude: f64, longitude: f64) -> bool {
    !(latitude == 0.0 && longitude == 0.0)
}

/// A completed trip. Distance units are whatever the API reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub device_id: Option<String>,
    pub distance: f64,
}

impl Trip {
    pub fn new(device_id: &str, distance: f64) -> Self {
        Self {
            device_id: Some(device_id.to_string()),
            distance,
        }
    }
}
