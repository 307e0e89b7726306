use serde::Serialize;

use crate::analyzers::types::Ignition;
use crate::view::{CategoryFilter, FleetViewEngine};

/// Counts behind the dashboard's summary cards.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FleetStats {
    pub total: usize,
    pub communicating: usize,
    pub offline: usize,
    pub driving: usize,
    pub ignition_on: usize,
    pub idling: usize,
    pub less_utilized: usize,
}

impl FleetStats {
    /// Tallies the whole roster, independent of the active search and page.
    pub fn from_engine(engine: &FleetViewEngine) -> Self {
        let mut s = FleetStats::default();

        for device in engine.devices() {
            s.total += 1;

            if engine.matches_filter(device, CategoryFilter::Communicating) {
                s.communicating += 1;
            }

            if engine.matches_filter(device, CategoryFilter::Driving) {
                s.driving += 1;
            }

            if engine.state_for(&device.id).ignition == Ignition::On {
                s.ignition_on += 1;
            }

            if engine.matches_filter(device, CategoryFilter::Idling) {
                s.idling += 1;
            }

            if engine.matches_filter(device, CategoryFilter::LessUtilized) {
                s.less_utilized += 1;
            }
        }

        s.offline = s.total - s.communicating;
        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn communicating_pct(&self) -> f64 {
        Self::pct(self.communicating, self.total)
    }

    /// Count for a summary card.
    pub fn count_for(&self, filter: CategoryFilter) -> usize {
        match filter {
            CategoryFilter::All => self.total,
            CategoryFilter::Communicating => self.communicating,
            CategoryFilter::Driving => self.driving,
            CategoryFilter::LessUtilized => self.less_utilized,
            CategoryFilter::Idling => self.idling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, IgnitionDiagnostic, StatusSnapshot};
    use crate::view::Channel;
    use crate::analyzers::utilization::{aggregate, window_for_today};
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    #[test]
    fn test_counts_follow_derived_states() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut engine = FleetViewEngine::default();

        let roster = engine.begin(Channel::Roster);
        engine.apply_roster(
            roster,
            vec![
                Device::new("b1", "Truck"),
                Device::new("b2", "Van"),
                Device::new("b3", "Pickup"),
            ],
            now,
        );

        let status = engine.begin(Channel::Snapshots);
        engine.apply_snapshots(
            status,
            vec![
                StatusSnapshot {
                    is_communicating: true,
                    is_driving: true,
                    ..StatusSnapshot::empty("b1")
                },
                StatusSnapshot {
                    is_communicating: true,
                    ignition: Some(IgnitionDiagnostic {
                        value: 1.0,
                        observed_at: now,
                    }),
                    ..StatusSnapshot::empty("b2")
                },
                // Not communicating: a fresh ON reading must not count.
                StatusSnapshot {
                    ignition: Some(IgnitionDiagnostic {
                        value: 1.0,
                        observed_at: now,
                    }),
                    ..StatusSnapshot::empty("b3")
                },
            ],
            now,
        );

        let window = window_for_today(Tz::UTC, now);
        let distances = engine.begin(Channel::Distances);
        engine.apply_distances(distances, aggregate(&[], &window));

        let stats = FleetStats::from_engine(&engine);
        assert_eq!(
            stats,
            FleetStats {
                total: 3,
                communicating: 2,
                offline: 1,
                driving: 1,
                ignition_on: 2,
                idling: 1,
                less_utilized: 2,
            }
        );
        assert_eq!(stats.count_for(CategoryFilter::Idling), 1);
        assert!((stats.communicating_pct() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_less_utilized_waits_for_distances() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut engine = FleetViewEngine::default();
        let roster = engine.begin(Channel::Roster);
        engine.apply_roster(roster, vec![Device::new("b1", "Truck")], now);
        let status = engine.begin(Channel::Snapshots);
        engine.apply_snapshots(
            status,
            vec![StatusSnapshot {
                is_communicating: true,
                ..StatusSnapshot::empty("b1")
            }],
            now,
        );

        let stats = FleetStats::from_engine(&engine);
        assert_eq!(stats.communicating, 1);
        assert_eq!(stats.offline, 0);
        assert_eq!(stats.less_utilized, 0);
    }

    #[test]
    fn test_pct_of_empty_fleet_is_zero() {
        assert_eq!(FleetStats::default().communicating_pct(), 0.0);
    }
}
