use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::{debug, info};

use super::wire::{
    AuthenticateResult, IGNITION_DIAGNOSTIC_ID, WireAddress, WireDevice, WireStatusInfo, WireTrip,
    WireUser,
};
use crate::error::{GatewayError, GatewayResult};
use crate::fetch::{HttpClient, post_json};
use crate::model::{self, Device, StatusSnapshot, Trip};
use crate::parser::parse_response;
use crate::services::telemetry_api::{DeviceQuery, TelemetryGateway};
use crate::session::Session;

/// Server value of `path` meaning "keep talking to the host you logged in on".
const SAME_SERVER: &str = "ThisServer";

pub struct GeotabClient<C> {
    http: C,
    endpoint: String,
    session: Session,
    results_limit: usize,
}

impl<C: HttpClient> GeotabClient<C> {
    /// Exchanges a user's password for a session.
    ///
    /// When the login host answers with a different `path`, the tenant lives on
    /// that server and every later call is sent there.
    #[tracing::instrument(skip(http, password))]
    pub async fn authenticate(
        http: C,
        server: &str,
        database: &str,
        user_name: &str,
        password: &str,
        results_limit: usize,
    ) -> GatewayResult<Self> {
        let body = json!({
            "method": "Authenticate",
            "params": {
                "database": database,
                "userName": user_name,
                "password": password,
            }
        });

        let bytes = post_json(&http, &endpoint(server), &body).await?;
        let result: AuthenticateResult = parse_response(&bytes)?;

        if result.credentials.session_id.is_empty() {
            return Err(GatewayError::SessionExpired(
                "server returned no session id".to_string(),
            ));
        }

        let server = match result.path.as_deref() {
            Some(path) if !path.is_empty() && path != SAME_SERVER => path.to_string(),
            _ => server.to_string(),
        };
        info!(server = %server, "Authenticated");

        Ok(Self::with_session(http, &server, result.credentials, results_limit))
    }

    /// Builds a client around an existing session without logging in.
    pub fn with_session(http: C, server: &str, session: Session, results_limit: usize) -> Self {
        Self {
            http,
            endpoint: endpoint(server),
            session,
            results_limit: results_limit.max(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, mut params: Value) -> GatewayResult<T> {
        params["credentials"] = serde_json::to_value(&self.session)?;
        let body = json!({ "method": method, "params": params });
        let bytes = post_json(&self.http, &self.endpoint, &body).await?;
        parse_response(&bytes)
    }

    async fn get<T: DeserializeOwned>(&self, type_name: &str, mut params: Value) -> GatewayResult<T> {
        params["typeName"] = json!(type_name);
        self.call("Get", params).await
    }

    /// Walks the device roster page by page, resuming after the last id seen.
    async fn list_device_pages(&self, search: Value) -> GatewayResult<Vec<Device>> {
        let mut devices = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut sort = json!({ "sortBy": "id", "sortDirection": "asc" });
            if let Some(last_id) = &cursor {
                sort["offset"] = json!(last_id);
                sort["lastId"] = json!(last_id);
            }

            let page: Vec<WireDevice> = self
                .get(
                    "Device",
                    json!({
                        "search": search.clone(),
                        "resultsLimit": self.results_limit,
                        "sort": sort,
                    }),
                )
                .await?;

            let fetched = page.len();
            let last_id = page.last().map(|d| d.id.clone());
            for wire in page {
                if seen.insert(wire.id.clone()) {
                    devices.push(Device::from(wire));
                }
            }
            debug!(fetched, total = devices.len(), "Device page received");

            if fetched < self.results_limit {
                break;
            }
            match last_id {
                Some(id) if cursor.as_ref() != Some(&id) => cursor = Some(id),
                _ => break,
            }
        }

        Ok(devices)
    }
}

fn endpoint(server: &str) -> String {
    format!("https://{}/apiv1", server.trim_end_matches('/'))
}

fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl<C: HttpClient> TelemetryGateway for GeotabClient<C> {
    fn session(&self) -> &Session {
        &self.session
    }

    #[tracing::instrument(skip(self))]
    async fn list_devices(&self, query: &DeviceQuery) -> GatewayResult<Vec<Device>> {
        let mut search = json!({});
        if query.exclude_untracked {
            search["excludeUntrackedAssets"] = json!(true);
            search["fromDate"] = json!(timestamp(Utc::now()));
        }

        match query.ids.as_deref() {
            Some([]) => Ok(Vec::new()),
            Some([id]) => {
                search["id"] = json!(id);
                self.list_device_pages(search).await
            }
            Some(ids) => {
                let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                let devices = self.list_device_pages(search).await?;
                Ok(devices
                    .into_iter()
                    .filter(|d| wanted.contains(d.id.as_str()))
                    .collect())
            }
            None => self.list_device_pages(search).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_status_snapshots(
        &self,
        device_ids: Option<&[String]>,
    ) -> GatewayResult<Vec<StatusSnapshot>> {
        if device_ids.is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut search = json!({ "diagnostics": [{ "id": IGNITION_DIAGNOSTIC_ID }] });
        if let Some([id]) = device_ids {
            search["deviceSearch"] = json!({ "id": id });
        }

        let wire: Vec<WireStatusInfo> = self
            .get("DeviceStatusInfo", json!({ "search": search }))
            .await?;
        let snapshots = wire.into_iter().map(StatusSnapshot::from);

        Ok(match device_ids {
            Some(ids) if ids.len() > 1 => {
                let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                snapshots
                    .filter(|s| wanted.contains(s.device_id.as_str()))
                    .collect()
            }
            _ => snapshots.collect(),
        })
    }

    #[tracing::instrument(skip(self, from, to), fields(from = %from, to = %to))]
    async fn list_trips(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> GatewayResult<Vec<Trip>> {
        let wire: Vec<WireTrip> = self
            .get(
                "Trip",
                json!({
                    "search": {
                        "fromDate": timestamp(from),
                        "toDate": timestamp(to),
                    }
                }),
            )
            .await?;
        Ok(wire.into_iter().map(Trip::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_user_time_zone(&self, user_name: &str) -> GatewayResult<String> {
        let users: Vec<WireUser> = self
            .get("User", json!({ "search": { "name": user_name } }))
            .await?;
        users
            .into_iter()
            .find_map(|u| u.time_zone_id.filter(|tz| !tz.is_empty()))
            .ok_or_else(|| GatewayError::not_found("User time zone", user_name))
    }

    #[tracing::instrument(skip(self))]
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> GatewayResult<Option<String>> {
        if !model::has_fix(latitude, longitude) {
            return Ok(None);
        }

        let addresses: Vec<WireAddress> = self
            .call(
                "GetAddresses",
                json!({ "coordinates": [{ "x": longitude, "y": latitude }] }),
            )
            .await?;
        addresses
            .into_iter()
            .find_map(|a| a.formatted_address.filter(|s| !s.is_empty()))
            .map(Some)
            .ok_or_else(|| GatewayError::not_found("Address", &format!("{latitude},{longitude}")))
    }
}
