// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule battery evaluation with per-rule failure isolation.
//!
//! Every rule runs inside its own error boundary: a failing task insert or
//! lead mutation is logged and swallowed so sibling rules still run, and
//! nothing propagates to the caller. The evaluator applies rules strictly
//! in table order, which is also the tie-break for conflicting lead
//! status writes (last write wins).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crewline_core::{CrewlineError, LeadStatus, Task};
use crewline_storage::{Database, queries};
use tracing::{debug, warn};

use crate::rules::{LeadAction, RULES, RuleContext};

/// Side-effect seam for the evaluator.
///
/// Production uses [`StorageSink`]; tests substitute fakes to observe
/// created tasks or inject failures into individual rules.
#[async_trait]
pub trait AutomationSink: Send + Sync {
    async fn create_task(&self, task: &Task) -> Result<(), CrewlineError>;
    async fn update_lead_status(
        &self,
        lead_id: &str,
        status: LeadStatus,
    ) -> Result<(), CrewlineError>;
    async fn convert_lead(
        &self,
        lead_id: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> Result<(), CrewlineError>;
}

/// Storage-backed sink used by the ingestion pipeline.
pub struct StorageSink {
    db: Arc<Database>,
}

impl StorageSink {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AutomationSink for StorageSink {
    async fn create_task(&self, task: &Task) -> Result<(), CrewlineError> {
        queries::tasks::insert_task(&self.db, task).await
    }

    async fn update_lead_status(
        &self,
        lead_id: &str,
        status: LeadStatus,
    ) -> Result<(), CrewlineError> {
        queries::leads::update_status(&self.db, lead_id, status).await
    }

    async fn convert_lead(
        &self,
        lead_id: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> Result<(), CrewlineError> {
        queries::leads::mark_converted(&self.db, lead_id, value, at).await
    }
}

/// Outcome summary for one evaluation pass, for logging and tests.
#[derive(Debug, Default)]
pub struct AutomationSummary {
    /// Names of rules that fired and applied cleanly.
    pub fired: Vec<&'static str>,
    /// Names of rules that fired but failed while applying.
    pub failed: Vec<&'static str>,
}

/// Run the full rule battery against one call snapshot.
///
/// Never returns an error: rule failures are logged and recorded in the
/// summary, and every rule gets its chance to run regardless of what
/// happened to the rules before it.
pub async fn run_automations<S>(sink: &S, ctx: &RuleContext<'_>) -> AutomationSummary
where
    S: AutomationSink + ?Sized,
{
    let mut summary = AutomationSummary::default();

    for rule in RULES {
        if !(rule.applies)(ctx) {
            continue;
        }
        let fire = (rule.build)(ctx);
        match apply_fire(sink, ctx, fire).await {
            Ok(()) => {
                debug!(rule = rule.name, call_id = %ctx.call.id, "automation rule fired");
                summary.fired.push(rule.name);
            }
            Err(e) => {
                warn!(
                    rule = rule.name,
                    call_id = %ctx.call.id,
                    error = %e,
                    "automation rule failed; continuing with remaining rules"
                );
                summary.failed.push(rule.name);
            }
        }
    }

    summary
}

async fn apply_fire<S>(
    sink: &S,
    ctx: &RuleContext<'_>,
    fire: crate::rules::RuleFire,
) -> Result<(), CrewlineError>
where
    S: AutomationSink + ?Sized,
{
    sink.create_task(&fire.task).await?;

    let (Some(action), Some(lead)) = (fire.lead_action, ctx.lead) else {
        return Ok(());
    };
    match action {
        LeadAction::Advance { to, from } => {
            // Guard against regressions: only move forward from the states
            // the rule names, judged against the snapshot.
            if from.contains(&lead.status) && to.rank() > lead.status.rank() {
                sink.update_lead_status(&lead.id, to).await?;
            }
        }
        LeadAction::Convert { value } => {
            sink.convert_lead(&lead.id, value, ctx.now).await?;
        }
    }
    Ok(())
}
