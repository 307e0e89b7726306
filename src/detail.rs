//! Single-vehicle detail view.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::analyzers::state::VehicleStateDeriver;
use crate::analyzers::types::VehicleState;
use crate::error::{GatewayError, GatewayResult};
use crate::model::{Device, StatusSnapshot};
use crate::services::telemetry_api::{DeviceQuery, TelemetryGateway};

pub const NO_LOCATION: &str = "No location data";
pub const ADDRESS_NOT_FOUND: &str = "Address not found";
pub const ADDRESS_UNAVAILABLE: &str = "Could not retrieve address";

/// Eight-point compass heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Heading {
    const ALL: [Heading; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Nearest compass point for a bearing in degrees.
    pub fn from_bearing(bearing: f64) -> Self {
        let index = (bearing / 45.0).round() as i64;
        Self::ALL[index.rem_euclid(8) as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "North",
            Self::NorthEast => "NE",
            Self::East => "East",
            Self::SouthEast => "SE",
            Self::South => "South",
            Self::SouthWest => "SW",
            Self::West => "West",
            Self::NorthWest => "NW",
        }
    }
}

/// Everything shown on a vehicle's detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDetail {
    pub device: Device,
    pub status: StatusSnapshot,
    pub state: VehicleState,
    pub address: String,
    /// Zone used to display timestamps.
    pub timezone: Tz,
}

impl VehicleDetail {
    pub fn heading(&self) -> Heading {
        Heading::from_bearing(self.status.bearing)
    }

    /// Whole kilometres.
    pub fn odometer_km(&self) -> i64 {
        (self.status.odometer / 1000.0).round() as i64
    }

    pub fn coordinates(&self) -> String {
        format!("{:.5}, {:.5}", self.status.latitude, self.status.longitude)
    }

    pub fn speed(&self) -> String {
        format!("{:.0} km/h", self.status.speed)
    }

    /// Last communication time in the display timezone, e.g. `May 1, 2024, 8:00:00 AM`.
    pub fn last_communicated(&self) -> Option<String> {
        self.status
            .last_update_at
            .map(|at| format_local(at, self.timezone))
    }
}

pub fn format_local(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant
        .with_timezone(&timezone)
        .format("%b %-d, %Y, %-I:%M:%S %p")
        .to_string()
}

/// Loads device and status together, then resolves the address.
///
/// Missing device or status is [`GatewayError::NotFound`]. Geocoding problems
/// only degrade the address text.
#[tracing::instrument(skip(gateway, deriver, timezone))]
pub async fn load_detail<G: TelemetryGateway + ?Sized>(
    gateway: &G,
    device_id: &str,
    deriver: &VehicleStateDeriver,
    timezone: Tz,
    now: DateTime<Utc>,
) -> GatewayResult<VehicleDetail> {
    let ids = [device_id.to_string()];
    let query = DeviceQuery::by_id(device_id);
    let (devices, statuses) = tokio::join!(
        gateway.list_devices(&query),
        gateway.list_status_snapshots(Some(ids.as_slice())),
    );

    let device = devices?
        .into_iter()
        .find(|d| d.id == device_id)
        .ok_or_else(|| GatewayError::not_found("Device", device_id))?;
    let status = statuses?
        .into_iter()
        .find(|s| s.device_id == device_id)
        .ok_or_else(|| GatewayError::not_found("Device status", device_id))?;

    let address = if status.has_fix() {
        match gateway.reverse_geocode(status.latitude, status.longitude).await {
            Ok(Some(address)) => address,
            Ok(None) => NO_LOCATION.to_string(),
            Err(GatewayError::NotFound { .. }) => ADDRESS_NOT_FOUND.to_string(),
            Err(e) => {
                warn!(error = %e, "Reverse geocoding failed");
                ADDRESS_UNAVAILABLE.to_string()
            }
        }
    } else {
        NO_LOCATION.to_string()
    };

    let state = deriver.derive(&device, &status, now);

    Ok(VehicleDetail {
        device,
        status,
        state,
        address,
        timezone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_from_bearing() {
        assert_eq!(Heading::from_bearing(0.0), Heading::North);
        assert_eq!(Heading::from_bearing(22.0), Heading::North);
        assert_eq!(Heading::from_bearing(23.0), Heading::NorthEast);
        assert_eq!(Heading::from_bearing(90.0), Heading::East);
        assert_eq!(Heading::from_bearing(200.0), Heading::South);
        assert_eq!(Heading::from_bearing(225.0), Heading::SouthWest);
        assert_eq!(Heading::from_bearing(300.0), Heading::NorthWest);
        assert_eq!(Heading::from_bearing(359.0), Heading::North);
        assert_eq!(Heading::SouthWest.as_str(), "SW");
    }

    #[test]
    fn test_display_helpers() {
        let detail = VehicleDetail {
            device: Device::new("b1", "Truck"),
            status: StatusSnapshot {
                latitude: 43.653226,
                longitude: -79.3831843,
                speed: 61.6,
                odometer: 123_456.0,
                last_update_at: Some("2024-05-01T12:00:00Z".parse().unwrap()),
                ..StatusSnapshot::empty("b1")
            },
            state: VehicleState::default(),
            address: NO_LOCATION.to_string(),
            timezone: Tz::America__Toronto,
        };

        assert_eq!(detail.odometer_km(), 123);
        assert_eq!(detail.coordinates(), "43.65323, -79.38318");
        assert_eq!(detail.speed(), "62 km/h");
        assert_eq!(
            detail.last_communicated().as_deref(),
            Some("May 1, 2024, 8:00:00 AM")
        );
    }
}
