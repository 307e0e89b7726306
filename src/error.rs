//! Telemetry gateway error types

use thiserror::Error;

/// Failures surfaced by the telemetry gateway.
///
/// None of these are retried automatically. The call site that triggered the
/// request turns them into a user-visible notification and keeps whatever was
/// displayed before.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Rate limited by the telemetry API")]
    RateLimited,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Entity not found: {entity} with key {key}")]
    NotFound { entity: String, key: String },

    #[error("Request rejected ({name}): {message}")]
    Rejected { name: String, message: String },
}

impl GatewayError {
    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    /// Notification text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionExpired(_) => "Session expired. Please log in again.".to_string(),
            Self::NetworkFailure(_) => "Could not reach the telematics service.".to_string(),
            Self::RateLimited => {
                "Too many requests. Please wait a moment before trying again.".to_string()
            }
            Self::MalformedResponse(_) => "Received unexpected data from the server.".to_string(),
            Self::NotFound { entity, .. } => format!("{entity} not found."),
            Self::Rejected { message, .. } => message.clone(),
        }
    }

    /// Whether the user has to authenticate again before anything else can work.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkFailure(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message_asks_user_to_wait() {
        let msg = GatewayError::RateLimited.user_message();
        assert!(msg.contains("wait"));
    }

    #[test]
    fn test_only_session_expired_requires_login() {
        assert!(GatewayError::SessionExpired("x".into()).requires_login());
        assert!(!GatewayError::RateLimited.requires_login());
        assert!(!GatewayError::not_found("Device", "b1").requires_login());
    }

    #[test]
    fn test_malformed_from_serde() {
        let err: GatewayError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }
}
