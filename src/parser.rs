//! JSON-RPC response parsing for the telemetry API.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{GatewayError, GatewayResult};

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<RpcErrorDetail>,
}

#[derive(Deserialize)]
struct RpcErrorDetail {
    name: Option<String>,
    message: Option<String>,
}

/// Decodes a JSON-RPC envelope, returning `result` or a classified error.
///
/// # Errors
///
/// Returns [`GatewayError::MalformedResponse`] if the bytes are not an
/// envelope of the expected shape, or the classified remote error if the
/// server answered with an `error` member.
pub fn parse_response<T: DeserializeOwned>(bytes: &[u8]) -> GatewayResult<T> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;

    if let Some(err) = envelope.error {
        let detail = err.errors.into_iter().next();
        let name = detail
            .as_ref()
            .and_then(|d| d.name.clone())
            .unwrap_or_default();
        let message = err
            .message
            .or_else(|| detail.and_then(|d| d.message))
            .unwrap_or_else(|| "Unknown API error".to_string());
        return Err(classify_error(&name, message));
    }

    envelope
        .result
        .ok_or_else(|| GatewayError::MalformedResponse("response has no result".to_string()))
}

/// Maps a server-side exception name onto the gateway taxonomy.
pub fn classify_error(name: &str, message: String) -> GatewayError {
    match name {
        "InvalidUserException" | "DbUnavailableException" => GatewayError::SessionExpired(message),
        "OverLimitException" => GatewayError::RateLimited,
        _ => GatewayError::Rejected {
            name: if name.is_empty() {
                "Unknown".to_string()
            } else {
                name.to_string()
            },
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_list() {
        let bytes = br#"{"result":[1,2,3],"jsonrpc":"2.0"}"#;
        let parsed: Vec<u32> = parse_response(bytes).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let result = parse_response::<Vec<u32>>(&[0xFF, 0xFE, 0x00]);
        assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
    }

    #[test]
    fn test_missing_result_is_malformed() {
        let result = parse_response::<Vec<u32>>(br#"{"jsonrpc":"2.0"}"#);
        assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
    }

    #[test]
    fn test_invalid_user_means_session_expired() {
        let bytes = br#"{"error":{"message":"Incorrect login credentials","errors":[{"name":"InvalidUserException","message":"Incorrect login credentials"}]}}"#;
        let result = parse_response::<Vec<u32>>(bytes);
        match result {
            Err(GatewayError::SessionExpired(msg)) => assert_eq!(msg, "Incorrect login credentials"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_over_limit_means_rate_limited() {
        let bytes = br#"{"error":{"message":"API calls quota exceeded","errors":[{"name":"OverLimitException"}]}}"#;
        assert!(matches!(
            parse_response::<Vec<u32>>(bytes),
            Err(GatewayError::RateLimited)
        ));
    }

    #[test]
    fn test_unknown_error_is_rejected_with_name() {
        let bytes = br#"{"error":{"errors":[{"name":"ArgumentException","message":"bad search"}]}}"#;
        match parse_response::<Vec<u32>>(bytes) {
            Err(GatewayError::Rejected { name, message }) => {
                assert_eq!(name, "ArgumentException");
                assert_eq!(message, "bad search");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
