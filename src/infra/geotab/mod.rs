//! MyGeotab JSON-RPC provider.
//!
//! Every request is a `POST /apiv1` whose body names a method and carries the
//! session credentials inside `params`.

mod client;
mod wire;

pub use client::GeotabClient;
