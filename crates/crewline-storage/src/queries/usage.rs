// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage ledger persistence.
//!
//! One row per (owner, calendar month). Creation is an atomic upsert and
//! `add_call` is a single UPDATE that recomputes the derived overage
//! columns from the raw counters, so concurrent webhook deliveries can
//! never race a read-modify-write or leave a stale overage value.

use chrono::{DateTime, Utc};
use crewline_core::{CrewlineError, PlanTier};
use rusqlite::params;

use crate::database::{Database, fmt_ts, parse_enum, parse_ts};
use crate::models::UsageLedger;

const LEDGER_COLUMNS: &str = "id, owner_id, month, plan, minutes_included, minutes_used, \
     minutes_overage, call_count, platform_cost, overage_charge, created_at, updated_at";

fn ledger_from_row(row: &rusqlite::Row<'_>) -> Result<UsageLedger, rusqlite::Error> {
    Ok(UsageLedger {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        month: row.get(2)?,
        plan: parse_enum(3, &row.get::<_, String>(3)?)?,
        minutes_included: row.get(4)?,
        minutes_used: row.get(5)?,
        minutes_overage: row.get(6)?,
        call_count: row.get(7)?,
        platform_cost: row.get(8)?,
        overage_charge: row.get(9)?,
        created_at: parse_ts(10, &row.get::<_, String>(10)?)?,
        updated_at: parse_ts(11, &row.get::<_, String>(11)?)?,
    })
}

/// Get the ledger row for (owner, month), creating it if absent.
///
/// The insert is `ON CONFLICT(owner_id, month) DO NOTHING` followed by a
/// read-back, so concurrent first-call-of-month races for the same owner
/// resolve to exactly one stored row.
pub async fn get_or_create(
    db: &Database,
    owner_id: &str,
    month: &str,
    plan: PlanTier,
    minutes_included: i64,
    now: DateTime<Utc>,
) -> Result<UsageLedger, CrewlineError> {
    let owner_id = owner_id.to_string();
    let month = month.to_string();
    let id = uuid::Uuid::new_v4().to_string();
    let plan = plan.to_string();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO usage_ledgers (id, owner_id, month, plan, minutes_included,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(owner_id, month) DO NOTHING",
                params![id, owner_id, month, plan, minutes_included, now],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEDGER_COLUMNS} FROM usage_ledgers WHERE owner_id = ?1 AND month = ?2"
            ))?;
            stmt.query_row(params![owner_id, month], ledger_from_row)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically add one call's usage to the (owner, month) ledger.
///
/// Increments call count, minutes, and platform cost, and recomputes
/// `minutes_overage` and `overage_charge` from the formulas in the same
/// UPDATE -- the previously stored overage values are never trusted.
/// Returns the updated row, or `None` when no ledger exists for the key.
pub async fn add_call(
    db: &Database,
    owner_id: &str,
    month: &str,
    minutes: i64,
    cost: f64,
    overage_rate: f64,
    now: DateTime<Utc>,
) -> Result<Option<UsageLedger>, CrewlineError> {
    let owner_id = owner_id.to_string();
    let month = month.to_string();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE usage_ledgers SET
                    call_count = call_count + 1,
                    minutes_used = minutes_used + ?3,
                    platform_cost = platform_cost + ?4,
                    minutes_overage = MAX(0, minutes_used + ?3 - minutes_included),
                    overage_charge = MAX(0, minutes_used + ?3 - minutes_included) * ?5,
                    updated_at = ?6
                 WHERE owner_id = ?1 AND month = ?2",
                params![owner_id, month, minutes, cost, overage_rate, now],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEDGER_COLUMNS} FROM usage_ledgers WHERE owner_id = ?1 AND month = ?2"
            ))?;
            stmt.query_row(params![owner_id, month], ledger_from_row)
                .map(Some)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Read the ledger for (owner, month) without creating it.
pub async fn get(
    db: &Database,
    owner_id: &str,
    month: &str,
) -> Result<Option<UsageLedger>, CrewlineError> {
    let owner_id = owner_id.to_string();
    let month = month.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEDGER_COLUMNS} FROM usage_ledgers WHERE owner_id = ?1 AND month = ?2"
            ))?;
            match stmt.query_row(params![owner_id, month], ledger_from_row) {
                Ok(ledger) => Ok(Some(ledger)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("usage.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn get_or_create_initializes_zeroed_row() {
        let (db, _dir) = setup_db().await;
        let ledger = get_or_create(&db, "owner-1", "2026-08", PlanTier::Starter, 300, Utc::now())
            .await
            .unwrap();
        assert_eq!(ledger.month, "2026-08");
        assert_eq!(ledger.plan, PlanTier::Starter);
        assert_eq!(ledger.minutes_included, 300);
        assert_eq!(ledger.minutes_used, 0);
        assert_eq!(ledger.call_count, 0);
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (db, _dir) = setup_db().await;
        let first = get_or_create(&db, "owner-1", "2026-08", PlanTier::Starter, 300, Utc::now())
            .await
            .unwrap();
        let second = get_or_create(&db, "owner-1", "2026-08", PlanTier::Starter, 300, Utc::now())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn concurrent_get_or_create_yields_one_row() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = Arc::clone(&db);
            handles.push(tokio::spawn(async move {
                get_or_create(&db, "owner-1", "2026-08", PlanTier::Trial, 30, Utc::now()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let count: i64 = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM usage_ledgers WHERE owner_id = 'owner-1' AND month = '2026-08'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1, "concurrent upserts must produce exactly one row");
    }

    #[tokio::test]
    async fn add_call_accumulates_and_recomputes_overage() {
        let (db, _dir) = setup_db().await;
        get_or_create(&db, "owner-1", "2026-08", PlanTier::Starter, 10, Utc::now())
            .await
            .unwrap();

        // Under the allowance: no overage.
        let ledger = add_call(&db, "owner-1", "2026-08", 6, 0.90, 0.35, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ledger.minutes_used, 6);
        assert_eq!(ledger.minutes_overage, 0);
        assert!((ledger.overage_charge - 0.0).abs() < 1e-10);
        assert_eq!(ledger.call_count, 1);

        // Crossing the allowance: overage recomputed from scratch.
        let ledger = add_call(&db, "owner-1", "2026-08", 7, 1.05, 0.35, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ledger.minutes_used, 13);
        assert_eq!(ledger.minutes_overage, 3);
        assert!((ledger.overage_charge - 3.0 * 0.35).abs() < 1e-10);
        assert_eq!(ledger.call_count, 2);
        assert!((ledger.platform_cost - 1.95).abs() < 1e-10);
    }

    #[tokio::test]
    async fn add_call_with_zero_rate_never_charges() {
        let (db, _dir) = setup_db().await;
        get_or_create(&db, "owner-1", "2026-08", PlanTier::Trial, 5, Utc::now())
            .await
            .unwrap();

        let ledger = add_call(&db, "owner-1", "2026-08", 50, 7.5, 0.0, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ledger.minutes_overage, 45);
        assert!((ledger.overage_charge - 0.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn add_call_without_ledger_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = add_call(&db, "ghost", "2026-08", 1, 0.15, 0.0, Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
