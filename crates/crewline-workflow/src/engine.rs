// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the external workflow engine.
//!
//! The engine itself is out of scope; Crewline only needs to POST a
//! trigger payload to it with a bounded timeout and report success or
//! failure back to the trigger matcher.

use std::time::Duration;

use async_trait::async_trait;
use crewline_core::{Agent, CallRecord, CrewlineError, ExtractedData, Sentiment};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::debug;

/// Payload sent to the engine when a trigger fires: the call's facts,
/// a minimal agent descriptor, and the extracted data verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowPayload {
    pub event: &'static str,
    pub call: PayloadCall,
    pub agent: PayloadAgent,
    pub extracted_data: ExtractedData,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadCall {
    pub id: String,
    pub direction: String,
    pub caller_phone: Option<String>,
    pub caller_name: Option<String>,
    pub duration_seconds: i64,
    pub status: String,
    pub sentiment: Option<Sentiment>,
    pub recording_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadAgent {
    pub id: String,
    pub name: String,
    pub agent_type: String,
}

impl WorkflowPayload {
    pub fn for_call(call: &CallRecord, agent: &Agent) -> Self {
        Self {
            event: "call.completed",
            call: PayloadCall {
                id: call.id.clone(),
                direction: call.direction.to_string(),
                caller_phone: call.caller_phone.clone(),
                caller_name: call.caller_name.clone(),
                duration_seconds: call.duration_seconds,
                status: call.status.to_string(),
                sentiment: call.sentiment,
                recording_url: call.recording_url.clone(),
            },
            agent: PayloadAgent {
                id: agent.id.clone(),
                name: agent.name.clone(),
                agent_type: agent.agent_type.clone(),
            },
            extracted_data: call.extracted.clone(),
        }
    }
}

/// Dispatch seam between the trigger matcher and the outside world.
///
/// Production uses [`HttpWorkflowEngine`]; pipeline tests substitute
/// in-memory fakes.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn trigger_workflow(
        &self,
        workflow_id: &str,
        payload: &WorkflowPayload,
    ) -> Result<(), CrewlineError>;
}

/// HTTP implementation of [`WorkflowEngine`].
///
/// Each dispatch is a single POST with a per-request timeout; there are
/// no retries, the matcher records the failure and moves on.
#[derive(Debug, Clone)]
pub struct HttpWorkflowEngine {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpWorkflowEngine {
    /// Builds the engine client.
    ///
    /// `api_key`, when present, is sent as a bearer token on every
    /// dispatch.
    pub fn new(
        base_url: String,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, CrewlineError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| CrewlineError::Config(format!("invalid engine API key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CrewlineError::Workflow {
                message: format!("failed to build engine HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl WorkflowEngine for HttpWorkflowEngine {
    async fn trigger_workflow(
        &self,
        workflow_id: &str,
        payload: &WorkflowPayload,
    ) -> Result<(), CrewlineError> {
        let url = format!("{}/workflows/{workflow_id}/trigger", self.base_url);
        debug!(workflow_id, %url, "dispatching workflow trigger");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CrewlineError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    CrewlineError::Workflow {
                        message: format!("dispatch request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrewlineError::Workflow {
                message: format!("engine returned {status}: {body}"),
                source: None,
            });
        }
        Ok(())
    }
}

/// No-op engine used when no engine URL is configured.
///
/// Matches still count as successful dispatches so trigger counters
/// behave consistently whether or not an engine is wired up.
#[derive(Debug, Clone, Default)]
pub struct DisabledEngine;

#[async_trait]
impl WorkflowEngine for DisabledEngine {
    async fn trigger_workflow(
        &self,
        workflow_id: &str,
        _payload: &WorkflowPayload,
    ) -> Result<(), CrewlineError> {
        debug!(workflow_id, "workflow dispatch disabled; dropping trigger");
        Ok(())
    }
}
