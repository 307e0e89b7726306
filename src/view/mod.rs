//! Fleet view engine.
//!
//! Owns the roster, the derived-state cache, the daily distance map and the
//! active [`ViewConfig`]. Every UI event goes through [`FleetViewEngine::apply_event`]
//! and the visible page is recomputed from scratch by
//! [`FleetViewEngine::compute_view`].

mod config;
mod engine;
mod sequence;

pub use config::{CategoryFilter, SortColumn, SortDirection, SortState, ViewConfig, ViewEvent};
pub use engine::{FleetViewEngine, VehicleRow, ViewPage, ViewSettings};
pub use sequence::{Channel, Sequencer, Ticket};
