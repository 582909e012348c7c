// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Crewline workspace.
//!
//! All entities are scoped to a single owning user id. Enum string forms are
//! snake_case both on the wire (serde) and in the database (strum), so a
//! value written by one crate always parses in another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Direction of a realized phone call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

/// Terminal status of a call as reported by the telephony provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Completed,
    Failed,
    #[serde(alias = "no-answer")]
    NoAnswer,
    Busy,
    Canceled,
}

/// Overall sentiment the voice provider assigned to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// CRM lead lifecycle status. Automations only ever move a lead forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
}

impl LeadStatus {
    /// Ordinal position in the forward-only lifecycle.
    pub fn rank(self) -> u8 {
        match self {
            LeadStatus::New => 0,
            LeadStatus::Contacted => 1,
            LeadStatus::Qualified => 2,
            LeadStatus::Converted => 3,
        }
    }
}

/// Kind of follow-up task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Call,
    Email,
    Meeting,
    FollowUp,
    Demo,
    Task,
    Reminder,
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Provenance tag recording what created a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    Manual,
    VoiceAgent,
    N8nWorkflow,
    Campaign,
}

/// Subscription plan tier, keying the static billing limits table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Trial,
    Starter,
    Professional,
    Enterprise,
}

/// Structured fields the voice provider claims to have parsed out of the
/// call transcript. Every field the automation rules read is named here;
/// missing fields mean "signal absent", never a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub qualified: bool,
    #[serde(default)]
    pub appointment_booked: bool,
    #[serde(default)]
    pub appointment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_captured: bool,
    #[serde(default)]
    pub payment_amount: Option<f64>,
}

/// Billed minutes for a call: ceiling of seconds / 60.
///
/// Rounding up means billing never undercounts actual usage. Non-positive
/// durations bill zero minutes.
pub fn billed_minutes(duration_seconds: i64) -> i64 {
    duration_seconds.max(0).div_ceil(60)
}

/// Durable record of one realized phone call.
///
/// Created exactly once per inbound webhook event. Immutable afterwards
/// except for the telephony status-callback path, which may patch status
/// and duration (recomputing minutes and cost).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Unique record identifier (UUID v4).
    pub id: String,
    pub owner_id: String,
    pub agent_id: String,
    pub direction: CallDirection,
    pub caller_phone: Option<String>,
    pub caller_name: Option<String>,
    /// Raw call duration in seconds as reported by the provider.
    pub duration_seconds: i64,
    /// Billed minutes: always `billed_minutes(duration_seconds)`.
    pub duration_minutes: i64,
    /// Per-minute platform rate in USD at the time of the call.
    pub rate_per_minute: f64,
    /// Always `duration_minutes * rate_per_minute`.
    pub total_cost: f64,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub status: CallStatus,
    pub sentiment: Option<Sentiment>,
    pub extracted: ExtractedData,
    /// Call id in the voice/telephony provider's system.
    pub provider_call_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A CRM contact derived from a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub email: String,
    /// True when `email` was synthesized from the phone number because the
    /// provider supplied none. Placeholder addresses are not deliverable
    /// and must be flagged as such wherever they are shown to users.
    pub email_is_placeholder: bool,
    pub phone: String,
    /// The agent type that produced this lead (e.g. "sales").
    pub source: String,
    pub qualified: bool,
    pub score: Option<f64>,
    pub estimated_value: Option<f64>,
    pub status: LeadStatus,
    /// The call this lead was created from. At most one lead per call.
    pub source_call_id: String,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Synthesized stand-in address for leads captured without an email.
    pub fn placeholder_email(phone: &str) -> String {
        format!("{phone}@temp.com")
    }
}

/// An actionable follow-up unit created by an automation rule (or, outside
/// this core, by manual CRUD).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_at: Option<DateTime<Utc>>,
    pub lead_id: Option<String>,
    pub call_id: Option<String>,
    pub created_by: TaskOrigin,
    pub agent_id: Option<String>,
    /// Set iff `status` is `Completed`; cleared when status moves away.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-owner, per-calendar-month usage aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLedger {
    pub id: String,
    pub owner_id: String,
    /// Calendar month key, "YYYY-MM".
    pub month: String,
    pub plan: PlanTier,
    pub minutes_included: i64,
    pub minutes_used: i64,
    /// Always `max(0, minutes_used - minutes_included)`; recomputed on
    /// every update, never independently mutated.
    pub minutes_overage: i64,
    pub call_count: i64,
    pub platform_cost: f64,
    /// Always `minutes_overage * plan overage rate` (zero on trial).
    pub overage_charge: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A configured voice agent. CRUD lives outside this core; the pipeline
/// only resolves agents by provider id or destination number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    /// Free-form agent type (e.g. "sales", "support", "scheduler").
    pub agent_type: String,
    /// Agent id assigned by the voice provider.
    pub provider_agent_id: Option<String>,
    /// Destination phone number routed to this agent.
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User-authored filter conditions for a workflow trigger rule.
///
/// Conjunctive: every populated condition must match. Empty lists and
/// `None` are vacuously true ("any").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConditions {
    #[serde(default)]
    pub agent_types: Vec<String>,
    #[serde(default)]
    pub call_statuses: Vec<CallStatus>,
    #[serde(default)]
    pub lead_qualified: Option<bool>,
}

impl TriggerConditions {
    /// Evaluate the conjunction against one call's facts.
    pub fn matches(&self, agent_type: &str, status: CallStatus, qualified: bool) -> bool {
        if !self.agent_types.is_empty() && !self.agent_types.iter().any(|t| t == agent_type) {
            return false;
        }
        if !self.call_statuses.is_empty() && !self.call_statuses.contains(&status) {
            return false;
        }
        if let Some(required) = self.lead_qualified {
            if qualified != required {
                return false;
            }
        }
        true
    }
}

/// A user-defined workflow trigger: stored conditions plus a reference to
/// a workflow in the external engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTriggerRule {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub enabled: bool,
    pub conditions: TriggerConditions,
    /// Workflow identifier in the external engine.
    pub workflow_id: String,
    pub execution_count: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
