//! Webhook API Handlers
//!
//! The gate in front of the provisioning loop: authenticate the
//! delivery against the raw body, parse and validate the payload, and
//! for a `queued` action hand off to a background provisioning task.
//! The acknowledgement goes out before the task does any work; every
//! other action is acknowledged with no side effect.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;

use crate::api::auth::{SIGNATURE_HEADER, verify_signature};
use crate::api::error::{ApiError, ApiResult};
use crate::provision::ScaleRequest;
use crate::state::AppState;
use gantry_core::dto::StatusResponse;
use gantry_core::event::{WorkflowJobAction, WorkflowJobWebhookPayload};

/// The only runner provider currently routed
const DOCKER_PROVIDER: &str = "docker";

/// POST /webhook/repo/{provider}
/// Handles a repository-scoped workflow job webhook
pub async fn repo_webhook(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<StatusResponse>> {
    let payload = authenticate_and_parse(&state, &provider, &headers, &body)?;

    if payload.action == WorkflowJobAction::Queued {
        state.spawn_provision(ScaleRequest::repo_scoped(
            payload.repository.owner.login,
            payload.repository.name,
        ));
    }

    Ok(Json(StatusResponse::ok("Webhook received")))
}

/// POST /webhook/org/{provider}
/// Handles an organization-scoped workflow job webhook
///
/// A payload without an organization is rejected outright rather than
/// silently falling back to repository scope.
pub async fn org_webhook(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<StatusResponse>> {
    let payload = authenticate_and_parse(&state, &provider, &headers, &body)?;

    let organization = payload
        .organization
        .ok_or_else(|| ApiError::Validation("No organization in payload".to_string()))?;

    if payload.action == WorkflowJobAction::Queued {
        state.spawn_provision(ScaleRequest::org_scoped(organization.login));
    }

    Ok(Json(StatusResponse::ok("Webhook received")))
}

/// Runs the gate checks shared by both webhook routes: provider
/// routing, signature verification over the raw body, then payload
/// deserialization.
fn authenticate_and_parse(
    state: &AppState,
    provider: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> ApiResult<WorkflowJobWebhookPayload> {
    if provider != DOCKER_PROVIDER {
        return Err(ApiError::Validation(format!(
            "Unknown runner provider: {provider}"
        )));
    }

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    verify_signature(&state.config.secret_token, body, header)?;

    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid webhook payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::sign;
    use crate::api::create_router;
    use crate::config::Config;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gantry_core::provider::{
        CredentialBroker, CredentialError, ProviderError, RunnerProvider,
    };
    use tower::ServiceExt;

    struct NullProvider;

    impl RunnerProvider for NullProvider {
        fn count_runners(&self) -> Result<usize, ProviderError> {
            Ok(0)
        }

        fn start_runner(&self, _url: &str, _token: &str) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    struct NullBroker;

    #[async_trait]
    impl CredentialBroker for NullBroker {
        async fn create_runner_token(
            &self,
            _owner: &str,
            _repo: Option<&str>,
        ) -> Result<String, CredentialError> {
            Ok("AABBCC".to_string())
        }
    }

    fn test_state() -> Arc<AppState> {
        AppState::new(
            Config::default(),
            Arc::new(NullProvider),
            Arc::new(NullBroker),
        )
    }

    fn test_app(state: Arc<AppState>) -> Router {
        create_router(state)
    }

    fn payload(action: &str, with_org: bool) -> String {
        let org = if with_org {
            r#","organization": {"id": 99, "login": "acme"}"#
        } else {
            ""
        };
        format!(
            r#"{{
                "action": "{action}",
                "repository": {{
                    "id": 42,
                    "name": "widgets",
                    "full_name": "acme/widgets",
                    "private": false,
                    "owner": {{"id": 7, "login": "acme"}}
                }}{org}
            }}"#
        )
    }

    fn signed_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(SIGNATURE_HEADER, sign("secret", body.as_bytes()))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn heartbeat_returns_ok() {
        let app = test_app(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/heartbeat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn queued_repo_webhook_dispatches_a_task() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let body = payload("queued", false);
        let response = app
            .oneshot(signed_request("/webhook/repo/docker", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.in_flight(), 1);
    }

    #[tokio::test]
    async fn non_queued_action_is_acknowledged_without_dispatch() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let body = payload("in_progress", false);
        let response = app
            .oneshot(signed_request("/webhook/repo/docker", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let body = payload("queued", false);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/repo/docker")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn forged_signature_is_rejected() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let body = payload("queued", false);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/repo/docker")
                    .header(SIGNATURE_HEADER, sign("wrong-secret", body.as_bytes()))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let response = app
            .oneshot(signed_request("/webhook/repo/docker", r#"{"action": 7}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let body = payload("queued", false);
        let response = app
            .oneshot(signed_request("/webhook/repo/nomad", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn org_webhook_without_organization_is_rejected() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let body = payload("queued", false);
        let response = app
            .oneshot(signed_request("/webhook/org/docker", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn org_webhook_dispatches_org_scoped_task() {
        let state = test_state();
        let app = test_app(Arc::clone(&state));

        let body = payload("queued", true);
        let response = app
            .oneshot(signed_request("/webhook/org/docker", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.in_flight(), 1);
    }
}
