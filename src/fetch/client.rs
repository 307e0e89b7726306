use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam between the gateway and the transport, so tests can script responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
