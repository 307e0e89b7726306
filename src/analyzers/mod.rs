//! Derivations over raw telemetry.
//!
//! [`state`] turns device + status pairs into a normalized [`types::VehicleState`];
//! [`utilization`] bounds "today" in a timezone and sums trip distance per device.

pub mod state;
pub mod types;
pub mod utilization;
