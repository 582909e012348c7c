// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook and health request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crewline_core::{CallDirection, CallStatus, ExtractedData, Sentiment};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::pipeline::{CallEvent, WebhookOutcome};
use crate::server::AppState;

/// Inbound call-completion payload from the voice provider.
///
/// Every field beyond agent resolution is optional, and every field is
/// parsed leniently: a missing field or a field of the wrong JSON shape
/// is the absence of that signal, never a reason to reject the webhook.
/// The provider's own `cost` figure is accepted and ignored; billing
/// uses the platform rate.
#[derive(Debug, Deserialize)]
pub struct CallEventPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub agent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub to_number: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub direction: Option<CallDirection>,
    #[serde(default, deserialize_with = "lenient")]
    pub caller_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub caller_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub duration: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<CallStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub transcript: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub recording_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub extracted_data: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub call_id: Option<String>,
}

/// Deserialize a field, mapping any wrong-shaped value to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Salvage extracted data field by field: one malformed field loses only
/// that signal, the rest still flow through.
fn salvage_extracted(value: Option<serde_json::Value>) -> ExtractedData {
    fn field<T: serde::de::DeserializeOwned>(
        map: &serde_json::Map<String, serde_json::Value>,
        key: &str,
    ) -> Option<T> {
        map.get(key)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    let Some(serde_json::Value::Object(map)) = value else {
        return ExtractedData::default();
    };
    ExtractedData {
        name: field(&map, "name"),
        email: field(&map, "email"),
        phone: field(&map, "phone"),
        interest: field(&map, "interest"),
        qualified: field(&map, "qualified").unwrap_or(false),
        appointment_booked: field(&map, "appointment_booked").unwrap_or(false),
        appointment_date: field(&map, "appointment_date"),
        payment_captured: field(&map, "payment_captured").unwrap_or(false),
        payment_amount: field(&map, "payment_amount"),
    }
}

impl CallEventPayload {
    fn into_event(self) -> CallEvent {
        CallEvent {
            provider_agent_id: self.agent_id,
            to_number: self.to_number,
            direction: self.direction.unwrap_or(CallDirection::Inbound),
            caller_phone: self.caller_phone,
            caller_name: self.caller_name,
            duration_seconds: self.duration.unwrap_or(0),
            status: self.status.unwrap_or(CallStatus::Completed),
            transcript: self.transcript,
            recording_url: self.recording_url,
            sentiment: self.sentiment,
            extracted: salvage_extracted(self.extracted_data),
            provider_call_id: self.call_id,
        }
    }
}

/// Telephony status callback: patches status/duration on an existing
/// call record.
#[derive(Debug, Deserialize)]
pub struct StatusCallbackPayload {
    pub call_id: String,
    pub status: CallStatus,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(rename = "callId")]
    pub call_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// POST /webhooks/calls/completed
pub async fn post_call_completed(
    State(state): State<AppState>,
    Json(payload): Json<CallEventPayload>,
) -> Response {
    match state.pipeline.process_call_event(payload.into_event()).await {
        Ok(WebhookOutcome::Recorded { call_id }) => (
            StatusCode::OK,
            Json(WebhookAck {
                received: true,
                call_id,
            }),
        )
            .into_response(),
        Ok(WebhookOutcome::NoAgent) => (
            StatusCode::OK,
            Json(MessageBody {
                message: "No agent found, but acknowledged".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "call recording failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageBody {
                    message: format!("failed to record call: {e}"),
                }),
            )
                .into_response()
        }
    }
}

/// POST /webhooks/calls/status
///
/// Always acknowledges: the telephony provider retries on anything
/// else, and there is nothing to retry here.
pub async fn post_call_status(
    State(state): State<AppState>,
    Json(payload): Json<StatusCallbackPayload>,
) -> Response {
    match state
        .pipeline
        .patch_call_status(&payload.call_id, payload.status, payload.duration)
        .await
    {
        Ok(true) => {
            info!(call_id = %payload.call_id, status = %payload.status, "call status patched");
            (
                StatusCode::OK,
                Json(MessageBody {
                    message: "Status updated".to_string(),
                }),
            )
                .into_response()
        }
        Ok(false) => (
            StatusCode::OK,
            Json(MessageBody {
                message: "Unknown call, acknowledged".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(call_id = %payload.call_id, error = %e, "status patch failed");
            (
                StatusCode::OK,
                Json(MessageBody {
                    message: "Status update failed, acknowledged".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
