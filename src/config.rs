//! Environment-based configuration.
//!
//! Loaded once at startup after `.env` has been read.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Runtime configuration for the dashboard.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API host, e.g. `my.geotab.com`
    pub server: String,

    pub database: String,
    pub username: String,
    pub password: String,

    /// Manual IANA timezone override for the "today" window
    pub timezone_override: Option<String>,

    /// Max age of an ignition reading still trusted to assert ON
    pub ignition_freshness: chrono::Duration,

    pub page_size: usize,

    /// Strict upper bound on daily distance for the lessUtilized filter
    pub less_utilized_threshold: f64,

    /// Cursor page cap for the device roster
    pub device_results_limit: usize,

    pub http_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: env::var("GEOTAB_SERVER").unwrap_or_else(|_| "my.geotab.com".to_string()),
            database: required("GEOTAB_DATABASE")?,
            username: required("GEOTAB_USERNAME")?,
            password: required("GEOTAB_PASSWORD")?,
            timezone_override: env::var("FLEETWATCH_TIMEZONE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            ignition_freshness: chrono::Duration::seconds(parsed("IGNITION_FRESHNESS_SECS", 300)?),
            page_size: parsed("PAGE_SIZE", 10)?,
            less_utilized_threshold: parsed("LESS_UTILIZED_THRESHOLD", 10.0)?,
            device_results_limit: parsed("DEVICE_RESULTS_LIMIT", 5000)?,
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS", 30)?),
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn parsed<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_falls_back_to_default_when_unset() {
        let v: usize = parsed("FLEETWATCH_TEST_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn test_required_names_missing_variable() {
        let err = required("FLEETWATCH_TEST_SURELY_UNSET_VAR").unwrap_err();
        assert!(err.to_string().contains("FLEETWATCH_TEST_SURELY_UNSET_VAR"));
    }
}
