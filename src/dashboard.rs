//! One dashboard session: gateway calls in, engine updates out.
//!
//! Roster, statuses and today's trips are fetched concurrently. Each result is
//! applied on its own, so one failing call never hides what the others
//! returned.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::analyzers::utilization::{aggregate, window_for_today};
use crate::detail::{VehicleDetail, load_detail};
use crate::error::{GatewayError, GatewayResult};
use crate::services::telemetry_api::{DeviceQuery, TelemetryGateway};
use crate::stats::FleetStats;
use crate::view::{Channel, FleetViewEngine, ViewConfig, ViewEvent};

/// A fetch that makes up a load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Roster,
    Statuses,
    Trips,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::Statuses => "statuses",
            Self::Trips => "trips",
        }
    }
}

/// Outcome of [`Dashboard::load`]. Empty `failures` means everything applied.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub failures: Vec<(Stage, GatewayError)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, stage: Stage) -> bool {
        self.failures.iter().any(|(s, _)| *s == stage)
    }

    pub fn requires_login(&self) -> bool {
        self.failures.iter().any(|(_, e)| e.requires_login())
    }

    fn record(&mut self, stage: Stage, err: GatewayError) {
        warn!(stage = stage.as_str(), error = %err, "Load stage failed");
        self.failures.push((stage, err));
    }
}

pub struct Dashboard<G> {
    gateway: G,
    engine: FleetViewEngine,
}

impl<G: TelemetryGateway> Dashboard<G> {
    pub fn new(gateway: G, engine: FleetViewEngine) -> Self {
        Self { gateway, engine }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn engine(&self) -> &FleetViewEngine {
        &self.engine
    }

    /// Picks the display timezone: manual override, then the user's own
    /// setting, then UTC. Unknown zone ids are skipped with a warning.
    pub async fn resolve_timezone(&self, manual: Option<&str>) -> Tz {
        if let Some(name) = manual {
            match name.parse::<Tz>() {
                Ok(tz) => return tz,
                Err(e) => warn!(timezone = name, error = %e, "Ignoring invalid timezone override"),
            }
        }

        let user_name = &self.gateway.session().user_name;
        match self.gateway.get_user_time_zone(user_name).await {
            Ok(name) => name.parse::<Tz>().unwrap_or_else(|e| {
                warn!(timezone = %name, error = %e, "User timezone is not a known zone, using UTC");
                Tz::UTC
            }),
            Err(e) => {
                warn!(error = %e, "Could not load user timezone, using UTC");
                Tz::UTC
            }
        }
    }

    /// Fetches roster, statuses and today's trips together and applies each
    /// result that arrives.
    #[tracing::instrument(skip(self), fields(timezone = %self.engine.timezone()))]
    pub async fn load(&mut self, now: DateTime<Utc>) -> RefreshReport {
        let window = window_for_today(self.engine.timezone(), now);
        let roster = self.engine.begin(Channel::Roster);
        let snapshots = self.engine.begin(Channel::Snapshots);
        let distances = self.engine.begin(Channel::Distances);

        let fleet = DeviceQuery::fleet();
        let (devices, statuses, trips) = tokio::join!(
            self.gateway.list_devices(&fleet),
            self.gateway.list_status_snapshots(None),
            self.gateway.list_trips(window.from, window.to),
        );

        let mut report = RefreshReport::default();

        match devices {
            Ok(devices) => {
                info!(count = devices.len(), "Roster loaded");
                self.engine.apply_roster(roster, devices, now);
            }
            Err(e) => report.record(Stage::Roster, e),
        }

        match statuses {
            Ok(statuses) => {
                info!(count = statuses.len(), "Statuses loaded");
                self.engine.apply_snapshots(snapshots, statuses, now);
            }
            Err(e) => report.record(Stage::Statuses, e),
        }

        match trips {
            Ok(trips) => {
                info!(count = trips.len(), day = %window.day, "Trips loaded");
                self.engine.apply_distances(distances, aggregate(&trips, &window));
            }
            Err(e) => report.record(Stage::Trips, e),
        }

        report
    }

    /// Switches the display timezone and rebuilds today's distances for it.
    ///
    /// On failure the previous distances stay on screen.
    pub async fn change_timezone(&mut self, timezone: Tz, now: DateTime<Utc>) -> GatewayResult<()> {
        self.engine.apply_event(ViewEvent::TimezoneChanged(timezone));
        self.refresh_distances(now).await
    }

    /// Re-fetches today's trips in the current timezone.
    #[tracing::instrument(skip(self), fields(timezone = %self.engine.timezone()))]
    pub async fn refresh_distances(&mut self, now: DateTime<Utc>) -> GatewayResult<()> {
        let window = window_for_today(self.engine.timezone(), now);
        let ticket = self.engine.begin(Channel::Distances);

        let trips = self
            .gateway
            .list_trips(window.from, window.to)
            .await
            .inspect_err(|e| warn!(error = %e, "Trip fetch failed"))?;

        self.engine
            .apply_distances(ticket, aggregate(&trips, &window));
        Ok(())
    }

    /// Applies a table interaction. Timezone changes belong in
    /// [`Dashboard::change_timezone`], which also refetches distances.
    pub fn dispatch(&mut self, event: ViewEvent) -> ViewConfig {
        self.engine.apply_event(event)
    }

    pub fn stats(&self) -> FleetStats {
        FleetStats::from_engine(&self.engine)
    }

    pub async fn detail(&self, device_id: &str, now: DateTime<Utc>) -> GatewayResult<VehicleDetail> {
        load_detail(
            &self.gateway,
            device_id,
            self.engine.deriver(),
            self.engine.timezone(),
            now,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, StatusSnapshot, Trip};
    use crate::session::Session;
    use crate::view::CategoryFilter;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGateway {
        session: Session,
        devices: Vec<Device>,
        statuses: Vec<StatusSnapshot>,
        trips: Vec<Trip>,
        user_tz: Option<String>,
        fail_statuses: bool,
        fail_trips: bool,
        trip_windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl TelemetryGateway for FakeGateway {
        fn session(&self) -> &Session {
            &self.session
        }

        async fn list_devices(&self, _query: &DeviceQuery) -> GatewayResult<Vec<Device>> {
            Ok(self.devices.clone())
        }

        async fn list_status_snapshots(
            &self,
            _device_ids: Option<&[String]>,
        ) -> GatewayResult<Vec<StatusSnapshot>> {
            if self.fail_statuses {
                return Err(GatewayError::RateLimited);
            }
            Ok(self.statuses.clone())
        }

        async fn list_trips(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> GatewayResult<Vec<Trip>> {
            self.trip_windows.lock().unwrap().push((from, to));
            if self.fail_trips {
                return Err(GatewayError::NetworkFailure("connection reset".into()));
            }
            Ok(self.trips.clone())
        }

        async fn get_user_time_zone(&self, user_name: &str) -> GatewayResult<String> {
            self.user_tz
                .clone()
                .ok_or_else(|| GatewayError::not_found("User time zone", user_name))
        }

        async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> GatewayResult<Option<String>> {
            Ok(None)
        }
    }

    fn fleet() -> FakeGateway {
        FakeGateway {
            devices: vec![Device::new("b1", "Truck"), Device::new("b2", "Van")],
            statuses: vec![StatusSnapshot {
                is_communicating: true,
                is_driving: true,
                ..StatusSnapshot::empty("b1")
            }],
            trips: vec![Trip::new("b1", 42.0), Trip::new("b1", 8.0)],
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_load_applies_everything() {
        let mut dash = Dashboard::new(fleet(), FleetViewEngine::default());
        let report = dash.load(now()).await;

        assert!(report.is_complete());
        assert_eq!(dash.engine().devices().len(), 2);
        assert!(dash.engine().state_for("b1").is_driving);
        assert_eq!(dash.engine().daily_distance("b1"), Some(50.0));
        assert_eq!(dash.engine().daily_distance("b2"), Some(0.0));
    }

    #[tokio::test]
    async fn test_failed_stage_does_not_block_the_rest() {
        let gateway = FakeGateway {
            fail_statuses: true,
            ..fleet()
        };
        let mut dash = Dashboard::new(gateway, FleetViewEngine::default());
        let report = dash.load(now()).await;

        assert!(report.failed(Stage::Statuses));
        assert!(!report.failed(Stage::Roster));
        assert!(!report.requires_login());
        assert_eq!(dash.engine().devices().len(), 2);
        assert_eq!(dash.engine().daily_distance("b1"), Some(50.0));
        assert!(!dash.engine().is_communicating("b1"));
    }

    #[tokio::test]
    async fn test_unknown_distances_are_not_less_utilized() {
        let gateway = FakeGateway {
            fail_trips: true,
            ..fleet()
        };
        let mut dash = Dashboard::new(gateway, FleetViewEngine::default());
        let report = dash.load(now()).await;

        assert!(report.failed(Stage::Trips));
        assert_eq!(dash.engine().daily_distance("b1"), None);
        assert_eq!(dash.stats().less_utilized, 0);

        dash.dispatch(ViewEvent::FilterClicked(CategoryFilter::LessUtilized));
        let view = dash.engine().current_view();
        assert_eq!(view.total_items, 0);
        assert!(view.rows.is_empty());
    }

    #[tokio::test]
    async fn test_change_timezone_requests_the_new_day() {
        let mut dash = Dashboard::new(fleet(), FleetViewEngine::default());
        dash.load(now()).await;
        dash.change_timezone(Tz::America__New_York, now())
            .await
            .unwrap();

        let windows = dash.gateway().trip_windows.lock().unwrap().clone();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].0, Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap());
        assert_eq!(dash.engine().timezone(), Tz::America__New_York);
        assert_eq!(
            dash.engine().distances().map(|d| d.timezone),
            Some(Tz::America__New_York)
        );
    }

    #[tokio::test]
    async fn test_failed_timezone_refresh_keeps_old_distances() {
        let mut dash = Dashboard::new(fleet(), FleetViewEngine::default());
        dash.load(now()).await;

        dash.gateway.fail_trips = true;
        let err = dash
            .change_timezone(Tz::Asia__Tokyo, now())
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::NetworkFailure(_)));
        assert_eq!(dash.engine().timezone(), Tz::Asia__Tokyo);
        assert_eq!(dash.engine().distances().map(|d| d.timezone), Some(Tz::UTC));
        assert_eq!(dash.engine().daily_distance("b1"), Some(50.0));
    }

    #[tokio::test]
    async fn test_resolve_timezone_order() {
        let gateway = FakeGateway {
            user_tz: Some("Europe/Berlin".into()),
            ..Default::default()
        };
        let dash = Dashboard::new(gateway, FleetViewEngine::default());

        assert_eq!(dash.resolve_timezone(Some("Asia/Tokyo")).await, Tz::Asia__Tokyo);
        assert_eq!(dash.resolve_timezone(Some("Mars/Base")).await, Tz::Europe__Berlin);
        assert_eq!(dash.resolve_timezone(None).await, Tz::Europe__Berlin);

        let bare = Dashboard::new(FakeGateway::default(), FleetViewEngine::default());
        assert_eq!(bare.resolve_timezone(None).await, Tz::UTC);
    }
}
