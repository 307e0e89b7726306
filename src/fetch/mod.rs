mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// POSTs `body` as JSON to `url` and returns the raw response bytes.
///
/// Transport failures and non-success statuses are classified here; the
/// payload itself is left to [`crate::parser`].
pub async fn post_json<C: HttpClient, B: Serialize + ?Sized>(
    client: &C,
    url: &str,
    body: &B,
) -> GatewayResult<Vec<u8>> {
    let mut req = reqwest::Request::new(
        reqwest::Method::POST,
        url.parse()
            .map_err(|e| GatewayError::NetworkFailure(format!("invalid endpoint {url}: {e}")))?,
    );
    req.headers_mut().insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    let resp = client.execute(req).await?;
    let status = resp.status();
    debug!(status = status.as_u16(), "Telemetry API responded");

    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::SessionExpired(
            format!("HTTP {}", status.as_u16()),
        )),
        s if !s.is_success() => Err(GatewayError::NetworkFailure(format!(
            "HTTP {}",
            s.as_u16()
        ))),
        _ => Ok(resp.bytes().await?.to_vec()),
    }
}
