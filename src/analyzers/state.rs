use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::analyzers::types::{Ignition, VehicleState};
use crate::model::{Device, StatusSnapshot};

/// Default age after which an ignition reading can no longer assert ON.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: i64 = 5 * 60;

/// Diagnostic value that means "ignition on".
const IGNITION_ON_VALUE: f64 = 1.0;

/// Converts device + status pairs into [`VehicleState`].
///
/// Rules, first match wins:
///
/// | Snapshot                            | Ignition                         | Driving | Idling |
/// |-------------------------------------|----------------------------------|---------|--------|
/// | not communicating                   | UNKNOWN                          | no      | no     |
/// | driving                             | ON                               | yes     | no     |
/// | no ignition reading                 | OFF                              | no      | no     |
/// | reading older than the window       | OFF                              | no      | no     |
/// | reading within the window (incl.)   | ON if value is 1, otherwise OFF  | no      | = ON   |
#[derive(Debug, Clone, Copy)]
pub struct VehicleStateDeriver {
    freshness_window: Duration,
}

impl Default for VehicleStateDeriver {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_FRESHNESS_WINDOW_SECS))
    }
}

impl VehicleStateDeriver {
    pub fn new(freshness_window: Duration) -> Self {
        Self { freshness_window }
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    pub fn derive(
        &self,
        _device: &Device,
        snapshot: &StatusSnapshot,
        now: DateTime<Utc>,
    ) -> VehicleState {
        if !snapshot.is_communicating {
            return VehicleState {
                ignition: Ignition::Unknown,
                is_driving: false,
                is_idling: false,
            };
        }

        if snapshot.is_driving {
            return VehicleState {
                ignition: Ignition::On,
                is_driving: true,
                is_idling: false,
            };
        }

        let ignition = match snapshot.ignition {
            None => Ignition::Off,
            Some(reading) if now - reading.observed_at > self.freshness_window => Ignition::Off,
            Some(reading) if reading.value == IGNITION_ON_VALUE => Ignition::On,
            Some(_) => Ignition::Off,
        };

        VehicleState {
            ignition,
            is_driving: false,
            is_idling: ignition == Ignition::On,
        }
    }

    /// Derives a state for every device in the roster.
    ///
    /// Devices missing from `snapshots` are derived from an empty snapshot.
    pub fn derive_all(
        &self,
        devices: &[Device],
        snapshots: &HashMap<String, StatusSnapshot>,
        now: DateTime<Utc>,
    ) -> HashMap<String, VehicleState> {
        devices
            .iter()
            .map(|device| {
                let state = match snapshots.get(&device.id) {
                    Some(snapshot) => self.derive(device, snapshot, now),
                    None => self.derive(device, &StatusSnapshot::empty(&device.id), now),
                };
                (device.id.clone(), state)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IgnitionDiagnostic;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(communicating: bool, driving: bool, reading: Option<(f64, Duration)>) -> StatusSnapshot {
        StatusSnapshot {
            device_id: "b1".into(),
            is_communicating: communicating,
            is_driving: driving,
            ignition: reading.map(|(value, age)| IgnitionDiagnostic {
                value,
                observed_at: now() - age,
            }),
            ..Default::default()
        }
    }

    fn derive(snap: &StatusSnapshot) -> VehicleState {
        VehicleStateDeriver::default().derive(&Device::new("b1", "Truck"), snap, now())
    }

    fn assert_idling_invariant(state: VehicleState) {
        if state.is_idling {
            assert_eq!(state.ignition, Ignition::On);
            assert!(!state.is_driving);
        }
    }

    #[test]
    fn test_not_communicating_is_always_unknown() {
        let readings = [
            None,
            Some((1.0, Duration::seconds(1))),
            Some((0.0, Duration::seconds(1))),
            Some((1.0, Duration::hours(3))),
        ];
        for driving in [false, true] {
            for reading in readings {
                let state = derive(&snapshot(false, driving, reading));
                assert_eq!(state, VehicleState::default());
                assert_eq!(state.ignition, Ignition::Unknown);
            }
        }
    }

    #[test]
    fn test_driving_implies_ignition_on_regardless_of_diagnostic() {
        for reading in [
            None,
            Some((0.0, Duration::seconds(10))),
            Some((1.0, Duration::hours(2))),
        ] {
            let state = derive(&snapshot(true, true, reading));
            assert_eq!(state.ignition, Ignition::On);
            assert!(state.is_driving);
            assert!(!state.is_idling);
        }
    }

    #[test]
    fn test_missing_diagnostic_is_off() {
        let state = derive(&snapshot(true, false, None));
        assert_eq!(state.ignition, Ignition::Off);
        assert!(!state.is_idling);
    }

    #[test]
    fn test_fresh_on_reading_means_idling() {
        let state = derive(&snapshot(true, false, Some((1.0, Duration::seconds(30)))));
        assert_eq!(state.ignition, Ignition::On);
        assert!(state.is_idling);
        assert_idling_invariant(state);
    }

    #[test]
    fn test_fresh_off_reading_is_off() {
        let state = derive(&snapshot(true, false, Some((0.0, Duration::seconds(30)))));
        assert_eq!(state.ignition, Ignition::Off);
    }

    #[test]
    fn test_freshness_boundary_is_inclusive() {
        let at_boundary = derive(&snapshot(true, false, Some((1.0, Duration::minutes(5)))));
        assert_eq!(at_boundary.ignition, Ignition::On);

        let past_boundary = derive(&snapshot(
            true,
            false,
            Some((1.0, Duration::minutes(5) + Duration::milliseconds(1))),
        ));
        assert_eq!(past_boundary.ignition, Ignition::Off);
        assert!(!past_boundary.is_idling);
    }

    #[test]
    fn test_custom_window() {
        let deriver = VehicleStateDeriver::new(Duration::minutes(2));
        let snap = snapshot(true, false, Some((1.0, Duration::minutes(3))));
        let state = deriver.derive(&Device::new("b1", "Truck"), &snap, now());
        assert_eq!(state.ignition, Ignition::Off);
    }

    #[test]
    fn test_idling_invariant_holds_everywhere() {
        for communicating in [false, true] {
            for driving in [false, true] {
                for reading in [
                    None,
                    Some((1.0, Duration::zero())),
                    Some((0.0, Duration::zero())),
                    Some((1.0, Duration::hours(1))),
                ] {
                    assert_idling_invariant(derive(&snapshot(communicating, driving, reading)));
                }
            }
        }
    }

    #[test]
    fn test_derive_all_defaults_missing_snapshots() {
        let devices = vec![Device::new("b1", "Truck"), Device::new("b2", "Van")];
        let mut snapshots = HashMap::new();
        snapshots.insert("b1".to_string(), snapshot(true, true, None));

        let states = VehicleStateDeriver::default().derive_all(&devices, &snapshots, now());
        assert_eq!(states.len(), 2);
        assert!(states["b1"].is_driving);
        assert_eq!(states["b2"], VehicleState::default());
    }
}
