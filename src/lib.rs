pub mod analyzers;
pub mod config;
pub mod dashboard;
pub mod detail;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod model;
pub mod output;
pub mod parser;
pub mod services;
pub mod session;
pub mod stats;
pub mod view;
