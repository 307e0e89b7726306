//! Trait and query types for talking to a fleet-telematics API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::GatewayResult;
use crate::model::{Device, StatusSnapshot, Trip};
use crate::session::Session;

/// Which devices a roster request should return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQuery {
    /// Restrict to these ids. `None` means the whole fleet.
    pub ids: Option<Vec<String>>,
    /// Skip assets that are not actively tracked.
    pub exclude_untracked: bool,
}

impl DeviceQuery {
    /// The whole tracked fleet.
    pub fn fleet() -> Self {
        Self {
            ids: None,
            exclude_untracked: true,
        }
    }

    pub fn by_id(id: &str) -> Self {
        Self {
            ids: Some(vec![id.to_string()]),
            exclude_untracked: false,
        }
    }
}

/// Abstraction over a telematics provider (e.g. MyGeotab).
///
/// Every method returns a typed [`crate::error::GatewayError`] on failure and
/// never retries.
#[async_trait]
pub trait TelemetryGateway: Send + Sync {
    /// Identity the gateway is authenticated as.
    fn session(&self) -> &Session;

    /// Returns every device matching `query`, following cursor pages.
    async fn list_devices(&self, query: &DeviceQuery) -> GatewayResult<Vec<Device>>;

    /// Latest status snapshot per device, optionally restricted to `device_ids`.
    async fn list_status_snapshots(
        &self,
        device_ids: Option<&[String]>,
    ) -> GatewayResult<Vec<StatusSnapshot>>;

    /// Trips between two instants.
    async fn list_trips(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> GatewayResult<Vec<Trip>>;

    /// IANA timezone id configured for `user_name`.
    async fn get_user_time_zone(&self, user_name: &str) -> GatewayResult<String>;

    /// Formatted address for a coordinate, `None` when there is no fix.
    async fn reverse_geocode(&self, latitude: f64, longitude: f64)
    -> GatewayResult<Option<String>>;
}
