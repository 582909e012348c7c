// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trigger matching and best-effort dispatch fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crewline_core::{Agent, CallRecord, Lead};
use crewline_storage::{Database, queries};
use tracing::{debug, warn};

use crate::engine::{WorkflowEngine, WorkflowPayload};

/// Outcome of one matching pass, for logging and tests.
#[derive(Debug, Default)]
pub struct DispatchSummary {
    pub dispatched: Vec<String>,
    pub failed: Vec<String>,
}

/// Evaluate every enabled trigger rule for the call's owner and dispatch
/// the matches.
///
/// Each dispatch is independent: a failure bumps the rule's failure
/// counter and is logged, then evaluation continues with the next rule.
/// Counter updates that themselves fail are logged and ignored so one
/// bad write cannot stall the fan-out.
pub async fn match_and_dispatch<E>(
    db: &Arc<Database>,
    engine: &E,
    call: &CallRecord,
    agent: &Agent,
    lead: Option<&Lead>,
    now: DateTime<Utc>,
) -> DispatchSummary
where
    E: WorkflowEngine + ?Sized,
{
    let mut summary = DispatchSummary::default();

    let rules = match queries::triggers::list_enabled_for_owner(db, &call.owner_id).await {
        Ok(rules) => rules,
        Err(e) => {
            warn!(owner_id = %call.owner_id, error = %e, "failed to load trigger rules");
            return summary;
        }
    };

    // The lead's stored flag wins over the raw extracted signal when a
    // lead exists for this call.
    let qualified = lead.map_or(call.extracted.qualified, |l| l.qualified);
    let payload = WorkflowPayload::for_call(call, agent);

    for rule in rules {
        if !rule.conditions.matches(&agent.agent_type, call.status, qualified) {
            continue;
        }
        match engine.trigger_workflow(&rule.workflow_id, &payload).await {
            Ok(()) => {
                debug!(rule = %rule.name, workflow_id = %rule.workflow_id, "workflow dispatched");
                if let Err(e) = queries::triggers::record_success(db, &rule.id, now).await {
                    warn!(rule = %rule.name, error = %e, "failed to record dispatch success");
                }
                summary.dispatched.push(rule.id);
            }
            Err(e) => {
                warn!(
                    rule = %rule.name,
                    workflow_id = %rule.workflow_id,
                    error = %e,
                    "workflow dispatch failed"
                );
                if let Err(e) = queries::triggers::record_failure(db, &rule.id).await {
                    warn!(rule = %rule.name, error = %e, "failed to record dispatch failure");
                }
                summary.failed.push(rule.id);
            }
        }
    }

    summary
}
