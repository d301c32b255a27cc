//! API Module
//!
//! HTTP surface of the autoscaler: a heartbeat endpoint and the two
//! webhook routes (repository- and organization-scoped).

pub mod auth;
pub mod error;
pub mod health;
pub mod webhook;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness
        .route("/heartbeat", get(health::heartbeat))
        // Webhook gates
        .route("/webhook/repo/{provider}", post(webhook::repo_webhook))
        .route("/webhook/org/{provider}", post(webhook::org_webhook))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
