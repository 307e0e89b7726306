use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Device, IgnitionDiagnostic, StatusSnapshot, Trip};
use crate::session::Session;

pub(crate) const IGNITION_DIAGNOSTIC_ID: &str = "DiagnosticIgnitionId";

/// Placeholder the API uses for entities with no owning device.
const NO_DEVICE_ID: &str = "NoDeviceId";

#[derive(Deserialize)]
pub(crate) struct EntityRef {
    pub(crate) id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthenticateResult {
    pub(crate) credentials: Session,
    pub(crate) path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDevice {
    pub(crate) id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    vehicle_identification_number: Option<String>,
    #[serde(default)]
    serial_number: Option<String>,
    #[serde(default)]
    time_zone_id: Option<String>,
    #[serde(default)]
    license_plate: Option<String>,
    #[serde(default)]
    device_type: Option<String>,
    #[serde(default)]
    device_plan_billing_info: Vec<WirePlan>,
    #[serde(default)]
    is_active_tracking_enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlan {
    device_plan_name: Option<String>,
}

impl From<WireDevice> for Device {
    fn from(w: WireDevice) -> Self {
        Device {
            id: w.id,
            name: w.name.unwrap_or_default(),
            vin: non_empty(w.vehicle_identification_number),
            serial_number: non_empty(w.serial_number),
            time_zone_id: non_empty(w.time_zone_id),
            license_plate: non_empty(w.license_plate),
            device_type: non_empty(w.device_type),
            rate_plan_name: non_empty(
                w.device_plan_billing_info
                    .into_iter()
                    .find_map(|p| p.device_plan_name),
            ),
            is_active_tracking_enabled: w.is_active_tracking_enabled,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStatusInfo {
    device: EntityRef,
    #[serde(default)]
    is_device_communicating: bool,
    #[serde(default)]
    is_driving: bool,
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    bearing: f64,
    #[serde(default)]
    odometer: f64,
    #[serde(default)]
    date_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "diagnostics")]
    status_data: Vec<WireStatusData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStatusData {
    diagnostic: EntityRef,
    data: Option<f64>,
    date_time: Option<DateTime<Utc>>,
}

impl From<WireStatusInfo> for StatusSnapshot {
    fn from(w: WireStatusInfo) -> Self {
        // Latest ignition reading wins if the server sends several.
        let ignition = w
            .status_data
            .iter()
            .filter(|d| d.diagnostic.id == IGNITION_DIAGNOSTIC_ID)
            .filter_map(|d| match (d.data, d.date_time) {
                (Some(value), Some(observed_at)) => Some(IgnitionDiagnostic { value, observed_at }),
                _ => None,
            })
            .max_by_key(|d| d.observed_at);

        StatusSnapshot {
            device_id: w.device.id,
            is_communicating: w.is_device_communicating,
            is_driving: w.is_driving,
            latitude: w.latitude,
            longitude: w.longitude,
            speed: w.speed,
            bearing: w.bearing,
            odometer: w.odometer,
            last_update_at: w.date_time,
            ignition,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct WireTrip {
    #[serde(default)]
    device: Option<EntityRef>,
    #[serde(default)]
    distance: f64,
}

impl From<WireTrip> for Trip {
    fn from(w: WireTrip) -> Self {
        Trip {
            device_id: w
                .device
                .map(|d| d.id)
                .filter(|id| !id.is_empty() && id != NO_DEVICE_ID),
            distance: w.distance,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireUser {
    pub(crate) time_zone_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAddress {
    pub(crate) formatted_address: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
