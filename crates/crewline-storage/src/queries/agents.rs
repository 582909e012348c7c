// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent lookup for webhook agent resolution.
//!
//! Full agent CRUD lives outside this core; the pipeline only needs to
//! create agents (for provisioning and tests) and resolve the agent a call
//! event belongs to.

use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::{Database, fmt_ts, parse_ts};
use crate::models::Agent;

fn agent_from_row(row: &rusqlite::Row<'_>) -> Result<Agent, rusqlite::Error> {
    Ok(Agent {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        agent_type: row.get(3)?,
        provider_agent_id: row.get(4)?,
        phone_number: row.get(5)?,
        created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
    })
}

const AGENT_COLUMNS: &str =
    "id, owner_id, name, agent_type, provider_agent_id, phone_number, created_at";

/// Create a new agent.
pub async fn create_agent(db: &Database, agent: &Agent) -> Result<(), CrewlineError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (id, owner_id, name, agent_type, provider_agent_id, phone_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    agent.id,
                    agent.owner_id,
                    agent.name,
                    agent.agent_type,
                    agent.provider_agent_id,
                    agent.phone_number,
                    fmt_ts(agent.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an agent by id.
pub async fn get_agent(db: &Database, id: &str) -> Result<Option<Agent>, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"))?;
            match stmt.query_row(params![id], agent_from_row) {
                Ok(agent) => Ok(Some(agent)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve the agent a call event belongs to.
///
/// Tries the provider-assigned agent id first, then the destination phone
/// number. Returns `None` when neither matches -- the caller treats that as
/// a recognized no-op, not an error.
pub async fn resolve_for_event(
    db: &Database,
    provider_agent_id: Option<&str>,
    to_number: Option<&str>,
) -> Result<Option<Agent>, CrewlineError> {
    let provider_agent_id = provider_agent_id.map(str::to_string);
    let to_number = to_number.map(str::to_string);
    db.connection()
        .call(move |conn| {
            if let Some(pid) = provider_agent_id {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {AGENT_COLUMNS} FROM agents WHERE provider_agent_id = ?1"
                ))?;
                match stmt.query_row(params![pid], agent_from_row) {
                    Ok(agent) => return Ok(Some(agent)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => {}
                    Err(e) => return Err(e),
                }
            }
            if let Some(number) = to_number {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {AGENT_COLUMNS} FROM agents WHERE phone_number = ?1"
                ))?;
                match stmt.query_row(params![number], agent_from_row) {
                    Ok(agent) => return Ok(Some(agent)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(None)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
