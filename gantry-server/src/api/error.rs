//! API Error Handling
//!
//! Error types for the webhook request path. Both authentication and
//! validation failures map to 400 with a generic JSON body; nothing
//! secret-derived ever ends up in a response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed, or mismatched webhook signature
    Auth(String),

    /// Malformed payload or an otherwise invalid request
    Validation(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            ApiError::Auth(msg) => {
                tracing::warn!("Rejected webhook: {}", msg);
                msg
            }
            ApiError::Validation(msg) => {
                tracing::warn!("Invalid webhook request: {}", msg);
                msg
            }
        };

        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_400() {
        let response = ApiError::Auth("No HMAC signature provided".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_errors_map_to_400() {
        let response = ApiError::Validation("No organization in payload".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
