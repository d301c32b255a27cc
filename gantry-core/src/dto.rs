//! DTOs
//!
//! Data transfer objects for the HTTP surface and the GitHub API.

use serde::{Deserialize, Serialize};

/// A generic status response
///
/// Returned by the heartbeat endpoint and as the webhook acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Short status code
    pub status: String,

    /// Human-readable status message
    pub msg: String,
}

impl StatusResponse {
    /// Create an `ok` status response with the given message
    pub fn ok(msg: impl Into<String>) -> Self {
        StatusResponse {
            status: "ok".to_string(),
            msg: msg.into(),
        }
    }
}

/// The GitHub response to a registration-token request
///
/// The expiry is carried along for logging but never enforced; see
/// DESIGN.md for the open question around token lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationTokenResponse {
    /// The short-lived registration token
    pub token: String,

    /// When the token expires, as reported by GitHub
    pub expires_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_serializes() {
        let response = StatusResponse::ok("Webhook received");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["msg"], "Webhook received");
    }

    #[test]
    fn parses_registration_token_response() {
        let raw = r#"{"token": "AABBCC", "expires_at": "2026-01-01T00:00:00Z"}"#;
        let response: RegistrationTokenResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(response.token, "AABBCC");
    }
}
