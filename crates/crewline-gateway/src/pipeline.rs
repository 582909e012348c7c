// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-event ingestion pipeline.
//!
//! Linear state machine per webhook delivery:
//! received → agent-resolved → call-recorded → usage-updated →
//! lead-resolved → automations-run → workflows-dispatched → acknowledged.
//!
//! The call record write is the source of truth: it fails the request.
//! Every stage after it is enrichment, individually guarded so a failure
//! there is logged and the pipeline moves on. Once a call is recorded
//! the provider must never be told to retry.

use std::sync::Arc;

use chrono::Utc;
use crewline_automation::{RuleContext, StorageSink, run_automations};
use crewline_billing::UsageMeter;
use crewline_core::{
    Agent, CallDirection, CallRecord, CrewlineError, ExtractedData, Lead, LeadStatus, Sentiment,
    billed_minutes,
};
use crewline_storage::{Database, queries};
use crewline_workflow::{WorkflowEngine, match_and_dispatch};
use tracing::{info, warn};
use uuid::Uuid;

/// A call-completion event after payload deserialization, with every
/// optional field already collapsed to "present or absent".
#[derive(Debug, Clone)]
pub struct CallEvent {
    pub provider_agent_id: Option<String>,
    pub to_number: Option<String>,
    pub direction: CallDirection,
    pub caller_phone: Option<String>,
    pub caller_name: Option<String>,
    pub duration_seconds: i64,
    pub status: crewline_core::CallStatus,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub extracted: ExtractedData,
    pub provider_call_id: Option<String>,
}

/// Terminal pipeline states that acknowledge the webhook.
#[derive(Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The call was recorded; downstream stages ran best-effort.
    Recorded { call_id: String },
    /// No agent matched the event. Acknowledged without recording.
    NoAgent,
}

/// The ingestion orchestrator, shared across requests.
pub struct Pipeline {
    db: Arc<Database>,
    meter: UsageMeter,
    engine: Arc<dyn WorkflowEngine>,
    rate_per_minute: f64,
}

impl Pipeline {
    pub fn new(db: Arc<Database>, engine: Arc<dyn WorkflowEngine>, rate_per_minute: f64) -> Self {
        let meter = UsageMeter::new(Arc::clone(&db));
        Self {
            db,
            meter,
            engine,
            rate_per_minute,
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Run one event through the full pipeline.
    ///
    /// Returns an error only when the call record write fails; that is
    /// the one failure the provider should retry.
    pub async fn process_call_event(&self, event: CallEvent) -> Result<WebhookOutcome, CrewlineError> {
        let now = Utc::now();

        let Some(agent) = queries::agents::resolve_for_event(
            &self.db,
            event.provider_agent_id.as_deref(),
            event.to_number.as_deref(),
        )
        .await?
        else {
            warn!(
                provider_agent_id = ?event.provider_agent_id,
                to_number = ?event.to_number,
                "call event matched no agent; acknowledging without recording"
            );
            return Ok(WebhookOutcome::NoAgent);
        };

        let call = self.build_call_record(&event, &agent);
        queries::calls::insert_call(&self.db, &call).await?;
        info!(
            call_id = %call.id,
            agent_id = %agent.id,
            owner_id = %call.owner_id,
            status = %call.status,
            minutes = call.duration_minutes,
            "call recorded"
        );

        if let Err(e) = self.update_usage(&call, now).await {
            warn!(call_id = %call.id, error = %e, "usage update failed; continuing");
        }

        let lead = match self.maybe_create_lead(&call, &agent, now).await {
            Ok(lead) => lead,
            Err(e) => {
                warn!(call_id = %call.id, error = %e, "lead creation failed; continuing");
                None
            }
        };

        let sink = StorageSink::new(Arc::clone(&self.db));
        let ctx = RuleContext {
            call: &call,
            lead: lead.as_ref(),
            agent: &agent,
            now,
        };
        let automation = run_automations(&sink, &ctx).await;
        if !automation.failed.is_empty() {
            warn!(call_id = %call.id, failed = ?automation.failed, "some automation rules failed");
        }

        let dispatch =
            match_and_dispatch(&self.db, self.engine.as_ref(), &call, &agent, lead.as_ref(), now)
                .await;
        if !dispatch.failed.is_empty() {
            warn!(call_id = %call.id, failed = ?dispatch.failed, "some workflow dispatches failed");
        }

        Ok(WebhookOutcome::Recorded { call_id: call.id })
    }

    /// Patch an existing call from a telephony status callback.
    ///
    /// Returns false when no record matches the provider call id; the
    /// caller still acknowledges.
    pub async fn patch_call_status(
        &self,
        provider_call_id: &str,
        status: crewline_core::CallStatus,
        duration_seconds: Option<i64>,
    ) -> Result<bool, CrewlineError> {
        let Some(call) = queries::calls::find_by_provider_call_id(&self.db, provider_call_id).await?
        else {
            return Ok(false);
        };
        queries::calls::patch_status(&self.db, &call.id, status, duration_seconds).await
    }

    fn build_call_record(&self, event: &CallEvent, agent: &Agent) -> CallRecord {
        let duration = event.duration_seconds.max(0);
        let minutes = billed_minutes(duration);
        CallRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: agent.owner_id.clone(),
            agent_id: agent.id.clone(),
            direction: event.direction,
            caller_phone: event.caller_phone.clone(),
            caller_name: event.caller_name.clone(),
            duration_seconds: duration,
            duration_minutes: minutes,
            rate_per_minute: self.rate_per_minute,
            total_cost: minutes as f64 * self.rate_per_minute,
            transcript: event.transcript.clone(),
            recording_url: event.recording_url.clone(),
            status: event.status,
            sentiment: event.sentiment,
            extracted: event.extracted.clone(),
            provider_call_id: event.provider_call_id.clone(),
            created_at: Utc::now(),
        }
    }

    async fn update_usage(
        &self,
        call: &CallRecord,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), CrewlineError> {
        let plan = queries::users::get_plan(&self.db, &call.owner_id).await?;
        self.meter
            .record_call(
                &call.owner_id,
                plan,
                call.duration_minutes,
                call.total_cost,
                now,
            )
            .await?;
        Ok(())
    }

    /// Create a lead iff the extracted data names a contact: a name plus
    /// a phone, where the phone may fall back to the caller's number.
    async fn maybe_create_lead(
        &self,
        call: &CallRecord,
        agent: &Agent,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<Lead>, CrewlineError> {
        let Some(name) = call.extracted.name.as_deref().filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let phone = call
            .extracted
            .phone
            .as_deref()
            .or(call.caller_phone.as_deref())
            .filter(|p| !p.is_empty());
        let Some(phone) = phone else {
            return Ok(None);
        };

        let (email, placeholder) = match call.extracted.email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) => (email.to_string(), false),
            None => (Lead::placeholder_email(phone), true),
        };
        let qualified = call.extracted.qualified;

        let lead = Lead {
            id: Uuid::new_v4().to_string(),
            owner_id: call.owner_id.clone(),
            name: name.to_string(),
            email,
            email_is_placeholder: placeholder,
            phone: phone.to_string(),
            source: agent.agent_type.clone(),
            qualified,
            score: None,
            estimated_value: None,
            status: if qualified {
                LeadStatus::Qualified
            } else {
                LeadStatus::New
            },
            source_call_id: call.id.clone(),
            last_contacted_at: Some(now),
            converted_at: None,
            created_at: now,
        };

        // Upsert keyed on the call id: re-delivery of the same call's
        // event returns the lead stored the first time.
        let stored = queries::leads::create_for_call(&self.db, &lead).await?;
        Ok(Some(stored))
    }
}
