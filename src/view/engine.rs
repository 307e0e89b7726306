use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::config::{CategoryFilter, SortColumn, SortDirection, ViewConfig, ViewEvent};
use super::sequence::{Channel, Sequencer, Ticket};
use crate::analyzers::state::VehicleStateDeriver;
use crate::analyzers::types::{DailyDistance, Ignition, VehicleState};
use crate::model::{Device, StatusSnapshot};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_LESS_UTILIZED_THRESHOLD: f64 = 10.0;

/// Fixed knobs of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub page_size: usize,
    /// A communicating device is "less utilized" when its daily distance is
    /// strictly below this.
    pub less_utilized_threshold: f64,
    /// Columns shown in the table. Time zone and rate plan only take part in
    /// search when they are visible.
    pub columns: Vec<SortColumn>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            less_utilized_threshold: DEFAULT_LESS_UTILIZED_THRESHOLD,
            columns: vec![
                SortColumn::Name,
                SortColumn::Vin,
                SortColumn::SerialNumber,
                SortColumn::Ignition,
            ],
        }
    }
}

/// One table row, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRow {
    pub device_id: String,
    pub name: String,
    pub vin: Option<String>,
    pub serial_number: Option<String>,
    pub time_zone_id: Option<String>,
    pub rate_plan_name: Option<String>,
    pub license_plate: Option<String>,
    pub device_type: Option<String>,
    pub is_communicating: bool,
    pub ignition: Ignition,
    pub is_driving: bool,
    pub is_idling: bool,
    pub speed: f64,
    pub last_update_at: Option<DateTime<Utc>>,
    pub daily_distance: Option<f64>,
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPage {
    pub rows: Vec<VehicleRow>,
    pub total_items: usize,
    pub total_pages: u32,
    pub current_page: u32,
}

/// Single owner of the roster, statuses, derived states, daily distances and
/// the active view configuration.
#[derive(Debug)]
pub struct FleetViewEngine {
    settings: ViewSettings,
    deriver: VehicleStateDeriver,
    devices: Vec<Device>,
    snapshots: HashMap<String, StatusSnapshot>,
    states: HashMap<String, VehicleState>,
    distances: Option<DailyDistance>,
    timezone: Tz,
    config: ViewConfig,
    sequencer: Sequencer,
}

impl Default for FleetViewEngine {
    fn default() -> Self {
        Self::new(ViewSettings::default(), VehicleStateDeriver::default(), Tz::UTC)
    }
}

impl FleetViewEngine {
    pub fn new(settings: ViewSettings, deriver: VehicleStateDeriver, timezone: Tz) -> Self {
        Self {
            settings: ViewSettings {
                page_size: settings.page_size.max(1),
                ..settings
            },
            deriver,
            devices: Vec::new(),
            snapshots: HashMap::new(),
            states: HashMap::new(),
            distances: None,
            timezone,
            config: ViewConfig::default(),
            sequencer: Sequencer::default(),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn deriver(&self) -> &VehicleStateDeriver {
        &self.deriver
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn distances(&self) -> Option<&DailyDistance> {
        self.distances.as_ref()
    }

    /// Derived state, or the inert default for a device with no snapshot.
    pub fn state_for(&self, device_id: &str) -> VehicleState {
        self.states.get(device_id).copied().unwrap_or_default()
    }

    pub fn snapshot_for(&self, device_id: &str) -> Option<&StatusSnapshot> {
        self.snapshots.get(device_id)
    }

    pub fn is_communicating(&self, device_id: &str) -> bool {
        self.snapshots
            .get(device_id)
            .is_some_and(|s| s.is_communicating)
    }

    /// Daily distance if the current map has been loaded; devices without trips
    /// count as zero once it has.
    pub fn daily_distance(&self, device_id: &str) -> Option<f64> {
        self.distances
            .as_ref()
            .map(|d| d.distance_for(device_id).unwrap_or(0.0))
    }

    /// Starts a fetch on `channel`; its result must be applied with this ticket.
    pub fn begin(&mut self, channel: Channel) -> Ticket {
        self.sequencer.issue(channel)
    }

    /// Replaces the roster. Ignored if a newer roster fetch has started.
    pub fn apply_roster(&mut self, ticket: Ticket, devices: Vec<Device>, now: DateTime<Utc>) -> bool {
        if !self.accepts(&ticket, Channel::Roster) {
            return false;
        }
        self.devices = devices;
        self.rederive(now);
        true
    }

    /// Replaces the status snapshots and rebuilds the derived-state cache.
    pub fn apply_snapshots(
        &mut self,
        ticket: Ticket,
        snapshots: Vec<StatusSnapshot>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.accepts(&ticket, Channel::Snapshots) {
            return false;
        }
        self.snapshots = snapshots
            .into_iter()
            .map(|s| (s.device_id.clone(), s))
            .collect();
        self.rederive(now);
        true
    }

    /// Replaces the daily distance map.
    pub fn apply_distances(&mut self, ticket: Ticket, distances: DailyDistance) -> bool {
        if !self.accepts(&ticket, Channel::Distances) {
            return false;
        }
        self.distances = Some(distances);
        self.reclamp();
        true
    }

    /// Runs `event` through the reducer and clamps the page to the result.
    pub fn apply_event(&mut self, event: ViewEvent) -> ViewConfig {
        if let ViewEvent::TimezoneChanged(tz) = &event {
            // The old distance map stays visible until the new one arrives.
            self.timezone = *tz;
        }
        let next = self.config.reduce(&event);
        let total_pages = self.total_pages(self.filtered(&next).len());
        self.config = next.clamped(total_pages);
        debug!(?event, page = self.config.page, "View event applied");
        self.config.clone()
    }

    /// The page for the engine's own configuration.
    pub fn current_view(&self) -> ViewPage {
        self.compute_view(&self.config)
    }

    /// Filter, search, sort, paginate. Pure: same data and config, same page.
    pub fn compute_view(&self, config: &ViewConfig) -> ViewPage {
        let filtered = self.filtered(config);
        let total_items = filtered.len();
        let total_pages = self.total_pages(total_items);
        let current_page = config.page.clamp(1, total_pages.max(1));

        let start = (current_page as usize - 1) * self.settings.page_size;
        let rows = filtered
            .into_iter()
            .skip(start)
            .take(self.settings.page_size)
            .map(|d| self.row(d))
            .collect();

        ViewPage {
            rows,
            total_items,
            total_pages,
            current_page,
        }
    }

    /// Whether `device` passes a summary-card filter.
    pub fn matches_filter(&self, device: &Device, filter: CategoryFilter) -> bool {
        match filter {
            CategoryFilter::All => true,
            CategoryFilter::Communicating => self.is_communicating(&device.id),
            CategoryFilter::Driving => self.state_for(&device.id).is_driving,
            CategoryFilter::Idling => self.state_for(&device.id).is_idling,
            // Unknown distance (trips not loaded) is never "below" the threshold.
            CategoryFilter::LessUtilized => {
                self.is_communicating(&device.id)
                    && self
                        .daily_distance(&device.id)
                        .is_some_and(|d| d < self.settings.less_utilized_threshold)
            }
        }
    }

    fn accepts(&self, ticket: &Ticket, channel: Channel) -> bool {
        if ticket.channel() != channel || !self.sequencer.is_current(ticket) {
            debug!(?channel, seq = ticket.seq(), "Dropping stale response");
            return false;
        }
        true
    }

    fn rederive(&mut self, now: DateTime<Utc>) {
        self.states = self.deriver.derive_all(&self.devices, &self.snapshots, now);
        self.reclamp();
    }

    fn reclamp(&mut self) {
        let total_pages = self.total_pages(self.filtered(&self.config).len());
        self.config = self.config.clone().clamped(total_pages);
    }

    fn total_pages(&self, items: usize) -> u32 {
        items.div_ceil(self.settings.page_size) as u32
    }

    fn filtered(&self, config: &ViewConfig) -> Vec<&Device> {
        let term = config.search_term.to_lowercase();
        let search_tz = self.settings.columns.contains(&SortColumn::TimeZone);
        let search_plan = self.settings.columns.contains(&SortColumn::RatePlan);

        let mut keyed: Vec<(String, &Device)> = self
            .devices
            .iter()
            .filter(|d| self.matches_filter(d, config.active_filter))
            .filter(|d| {
                if term.is_empty() {
                    return true;
                }
                let hit = |value: Option<&str>| {
                    value.is_some_and(|v| v.to_lowercase().contains(&term))
                };
                hit(Some(d.name.as_str()))
                    || hit(d.vin.as_deref())
                    || hit(d.serial_number.as_deref())
                    || (search_tz && hit(d.time_zone_id.as_deref()))
                    || (search_plan && hit(d.rate_plan_name.as_deref()))
            })
            .map(|d| (self.sort_key(d, config.sort.column), d))
            .collect();

        // `sort_by` is stable; ties keep roster order in both directions.
        match config.sort.direction {
            SortDirection::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
            SortDirection::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        keyed.into_iter().map(|(_, d)| d).collect()
    }

    fn sort_key(&self, device: &Device, column: SortColumn) -> String {
        let value = match column {
            SortColumn::Name => Some(device.name.as_str()),
            SortColumn::Vin => device.vin.as_deref(),
            SortColumn::SerialNumber => device.serial_number.as_deref(),
            SortColumn::TimeZone => device.time_zone_id.as_deref(),
            SortColumn::RatePlan => device.rate_plan_name.as_deref(),
            SortColumn::LicensePlate => device.license_plate.as_deref(),
            SortColumn::DeviceType => device.device_type.as_deref(),
            SortColumn::Ignition => Some(self.state_for(&device.id).ignition.as_str()),
        };
        value.unwrap_or_default().to_lowercase()
    }

    fn row(&self, device: &Device) -> VehicleRow {
        let state = self.state_for(&device.id);
        let snapshot = self.snapshots.get(&device.id);
        VehicleRow {
            device_id: device.id.clone(),
            name: device.name.clone(),
            vin: device.vin.clone(),
            serial_number: device.serial_number.clone(),
            time_zone_id: device.time_zone_id.clone(),
            rate_plan_name: device.rate_plan_name.clone(),
            license_plate: device.license_plate.clone(),
            device_type: device.device_type.clone(),
            is_communicating: snapshot.is_some_and(|s| s.is_communicating),
            ignition: state.ignition,
            is_driving: state.is_driving,
            is_idling: state.is_idling,
            speed: snapshot.map(|s| s.speed).unwrap_or_default(),
            last_update_at: snapshot.and_then(|s| s.last_update_at),
            daily_distance: self.daily_distance(&device.id),
        }
    }
}
