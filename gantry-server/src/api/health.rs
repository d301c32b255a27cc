//! Heartbeat API Handler
//!
//! Simple liveness endpoint for monitoring.

use axum::Json;

use gantry_core::dto::StatusResponse;

/// GET /heartbeat
/// Reports that the service is up
pub async fn heartbeat() -> Json<StatusResponse> {
    Json(StatusResponse::ok("Service is up and running"))
}
