//! Capabilities consumed from the outside world.

pub mod telemetry_api;
