// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal user plan lookup.
//!
//! Subscription management is out of scope; the pipeline only needs to
//! resolve an owner's plan tier when creating a usage ledger row. Owners
//! without a stored row default to the trial tier.

use crewline_core::{CrewlineError, PlanTier};
use rusqlite::params;

use crate::database::Database;

/// Set (or update) an owner's plan tier.
pub async fn set_plan(db: &Database, owner_id: &str, plan: PlanTier) -> Result<(), CrewlineError> {
    let owner_id = owner_id.to_string();
    let plan = plan.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, plan) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET plan = excluded.plan",
                params![owner_id, plan],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up an owner's plan tier, defaulting to trial when unknown.
pub async fn get_plan(db: &Database, owner_id: &str) -> Result<PlanTier, CrewlineError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT plan FROM users WHERE id = ?1",
                params![owner_id],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(plan) => crate::database::parse_enum(0, &plan).map(Some),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
        .map(|plan| plan.unwrap_or(PlanTier::Trial))
}
