// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call record persistence.
//!
//! Call records are written exactly once per webhook event. The only
//! after-the-fact mutation is [`patch_status`], the telephony status
//! callback path, which keeps the minutes/cost invariants intact by
//! recomputing both inside the UPDATE.

use crewline_core::{CallStatus, CrewlineError};
use rusqlite::params;

use crate::database::{Database, fmt_ts, parse_enum, parse_ts};
use crate::models::CallRecord;

const CALL_COLUMNS: &str = "id, owner_id, agent_id, direction, caller_phone, caller_name, \
     duration_seconds, duration_minutes, rate_per_minute, total_cost, transcript, \
     recording_url, status, sentiment, extracted_data, provider_call_id, created_at";

fn call_from_row(row: &rusqlite::Row<'_>) -> Result<CallRecord, rusqlite::Error> {
    let extracted_json: String = row.get(14)?;
    let extracted = serde_json::from_str(&extracted_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(14, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let sentiment = match row.get::<_, Option<String>>(13)? {
        Some(s) => Some(parse_enum(13, &s)?),
        None => None,
    };
    Ok(CallRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        agent_id: row.get(2)?,
        direction: parse_enum(3, &row.get::<_, String>(3)?)?,
        caller_phone: row.get(4)?,
        caller_name: row.get(5)?,
        duration_seconds: row.get(6)?,
        duration_minutes: row.get(7)?,
        rate_per_minute: row.get(8)?,
        total_cost: row.get(9)?,
        transcript: row.get(10)?,
        recording_url: row.get(11)?,
        status: parse_enum(12, &row.get::<_, String>(12)?)?,
        sentiment,
        extracted,
        provider_call_id: row.get(15)?,
        created_at: parse_ts(16, &row.get::<_, String>(16)?)?,
    })
}

/// Insert a new call record. Exactly one durable write; failures surface
/// to the caller (no internal retry).
pub async fn insert_call(db: &Database, call: &CallRecord) -> Result<(), CrewlineError> {
    let call = call.clone();
    let extracted_json = serde_json::to_string(&call.extracted)
        .map_err(|e| CrewlineError::Internal(format!("extracted data serialization: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO calls (id, owner_id, agent_id, direction, caller_phone, caller_name,
                    duration_seconds, duration_minutes, rate_per_minute, total_cost, transcript,
                    recording_url, status, sentiment, extracted_data, provider_call_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    call.id,
                    call.owner_id,
                    call.agent_id,
                    call.direction.to_string(),
                    call.caller_phone,
                    call.caller_name,
                    call.duration_seconds,
                    call.duration_minutes,
                    call.rate_per_minute,
                    call.total_cost,
                    call.transcript,
                    call.recording_url,
                    call.status.to_string(),
                    call.sentiment.map(|s| s.to_string()),
                    extracted_json,
                    call.provider_call_id,
                    fmt_ts(call.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a call record by id.
pub async fn get_call(db: &Database, id: &str) -> Result<Option<CallRecord>, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = ?1"))?;
            match stmt.query_row(params![id], call_from_row) {
                Ok(call) => Ok(Some(call)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find a call record by the provider's call id.
pub async fn find_by_provider_call_id(
    db: &Database,
    provider_call_id: &str,
) -> Result<Option<CallRecord>, CrewlineError> {
    let provider_call_id = provider_call_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CALL_COLUMNS} FROM calls WHERE provider_call_id = ?1"
            ))?;
            match stmt.query_row(params![provider_call_id], call_from_row) {
                Ok(call) => Ok(Some(call)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Patch a call's status (and optionally its duration) from a telephony
/// status callback.
///
/// When a new duration is supplied, billed minutes and total cost are
/// recomputed in the same UPDATE so the record never violates its
/// invariants. Returns `false` when no record with that id exists.
pub async fn patch_status(
    db: &Database,
    id: &str,
    status: CallStatus,
    duration_seconds: Option<i64>,
) -> Result<bool, CrewlineError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE calls SET
                    status = ?2,
                    duration_seconds = COALESCE(?3, duration_seconds),
                    duration_minutes = (MAX(COALESCE(?3, duration_seconds), 0) + 59) / 60,
                    total_cost = ((MAX(COALESCE(?3, duration_seconds), 0) + 59) / 60) * rate_per_minute
                 WHERE id = ?1",
                params![id, status, duration_seconds],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
