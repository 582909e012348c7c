// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow trigger rule persistence.
//!
//! Rules are authored via CRUD outside this core; the pipeline reads the
//! enabled set per owner and updates the dispatch counters after each
//! attempt.

use chrono::{DateTime, Utc};
use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::{Database, fmt_ts, parse_ts, parse_ts_opt};
use crate::models::WorkflowTriggerRule;

const TRIGGER_COLUMNS: &str = "id, owner_id, name, enabled, conditions, workflow_id, \
     execution_count, success_count, failure_count, last_executed_at, created_at";

fn trigger_from_row(row: &rusqlite::Row<'_>) -> Result<WorkflowTriggerRule, rusqlite::Error> {
    let conditions_json: String = row.get(4)?;
    let conditions = serde_json::from_str(&conditions_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(WorkflowTriggerRule {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        enabled: row.get(3)?,
        conditions,
        workflow_id: row.get(5)?,
        execution_count: row.get(6)?,
        success_count: row.get(7)?,
        failure_count: row.get(8)?,
        last_executed_at: parse_ts_opt(9, row.get(9)?)?,
        created_at: parse_ts(10, &row.get::<_, String>(10)?)?,
    })
}

/// Create a new trigger rule.
pub async fn create_trigger(
    db: &Database,
    rule: &WorkflowTriggerRule,
) -> Result<(), CrewlineError> {
    let rule = rule.clone();
    let conditions_json = serde_json::to_string(&rule.conditions)
        .map_err(|e| CrewlineError::Internal(format!("trigger conditions serialization: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO workflow_triggers (id, owner_id, name, enabled, conditions,
                    workflow_id, execution_count, success_count, failure_count,
                    last_executed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    rule.id,
                    rule.owner_id,
                    rule.name,
                    rule.enabled,
                    conditions_json,
                    rule.workflow_id,
                    rule.execution_count,
                    rule.success_count,
                    rule.failure_count,
                    rule.last_executed_at.map(fmt_ts),
                    fmt_ts(rule.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a trigger rule by id.
pub async fn get_trigger(
    db: &Database,
    id: &str,
) -> Result<Option<WorkflowTriggerRule>, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIGGER_COLUMNS} FROM workflow_triggers WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], trigger_from_row) {
                Ok(rule) => Ok(Some(rule)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all enabled trigger rules for an owner, oldest first.
pub async fn list_enabled_for_owner(
    db: &Database,
    owner_id: &str,
) -> Result<Vec<WorkflowTriggerRule>, CrewlineError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIGGER_COLUMNS} FROM workflow_triggers
                 WHERE owner_id = ?1 AND enabled = 1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![owner_id], trigger_from_row)?;
            let mut rules = Vec::new();
            for row in rows {
                rules.push(row?);
            }
            Ok(rules)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a successful dispatch: bump execution and success counters and
/// stamp the execution time.
pub async fn record_success(
    db: &Database,
    id: &str,
    executed_at: DateTime<Utc>,
) -> Result<(), CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE workflow_triggers SET
                    execution_count = execution_count + 1,
                    success_count = success_count + 1,
                    last_executed_at = ?2
                 WHERE id = ?1",
                params![id, fmt_ts(executed_at)],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed dispatch: bump the failure counter only.
pub async fn record_failure(db: &Database, id: &str) -> Result<(), CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE workflow_triggers SET failure_count = failure_count + 1 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
