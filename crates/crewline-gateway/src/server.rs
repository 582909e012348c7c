// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use crewline_core::CrewlineError;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handlers;
use crate::pipeline::Pipeline;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the full route table.
///
/// Webhook routes are unauthenticated: the voice provider signs
/// nothing, and the worst a forged event can do is land in a tenant the
/// attacker can already identify agents for. Revisit if the provider
/// adds signatures.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/webhooks/calls/completed",
            post(handlers::post_call_completed),
        )
        .route("/webhooks/calls/status", post(handlers::post_call_status))
        .route("/health", get(handlers::get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), CrewlineError> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CrewlineError::Config(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "webhook server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| CrewlineError::Internal(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{event, setup_pipeline};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use crewline_core::CallStatus;
    use tower::ServiceExt;

    async fn test_router() -> (Router, tempfile::TempDir) {
        let (pipeline, _db, dir) = setup_pipeline().await;
        let state = AppState {
            pipeline: Arc::new(pipeline),
            start_time: Instant::now(),
        };
        (router(state), dir)
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn completed_webhook_acknowledges_with_call_id() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(json_post(
                "/webhooks/calls/completed",
                serde_json::json!({
                    "agent_id": "prov-agent-1",
                    "caller_phone": "+15551234567",
                    "duration": 185,
                    "status": "completed",
                    "extracted_data": { "name": "Jane", "qualified": true },
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["received"], true);
        assert!(body["callId"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn unknown_agent_is_acknowledged_with_message() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(json_post(
                "/webhooks/calls/completed",
                serde_json::json!({ "agent_id": "nobody", "duration": 30 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "No agent found, but acknowledged");
    }

    #[tokio::test]
    async fn wrong_shaped_optional_fields_still_record_the_call() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(json_post(
                "/webhooks/calls/completed",
                serde_json::json!({
                    "agent_id": "prov-agent-1",
                    "duration": 90,
                    "extracted_data": { "qualified": "yes", "name": 42 },
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["received"], true);
    }

    #[tokio::test]
    async fn provider_status_spelling_with_hyphen_is_accepted() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(json_post(
                "/webhooks/calls/completed",
                serde_json::json!({ "agent_id": "prov-agent-1", "status": "no-answer" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_callback_acknowledges_unknown_calls() {
        let (pipeline, _db, _dir) = setup_pipeline().await;
        // Record one call so the route has data to miss against.
        pipeline
            .process_call_event(event(CallStatus::Completed, Default::default()))
            .await
            .unwrap();
        let state = AppState {
            pipeline: Arc::new(pipeline),
            start_time: Instant::now(),
        };
        let app = router(state);

        let response = app
            .oneshot(json_post(
                "/webhooks/calls/status",
                serde_json::json!({ "call_id": "prov-call-unknown", "status": "failed" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Unknown call, acknowledged");
    }
}
