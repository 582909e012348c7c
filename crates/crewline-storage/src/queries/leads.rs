// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead persistence.
//!
//! A lead is created at most once per originating call; `source_call_id`
//! is UNIQUE and creation goes through an upsert that returns the stored
//! row, so re-running the pipeline on the same call can never duplicate.

use chrono::{DateTime, Utc};
use crewline_core::{CrewlineError, LeadStatus};
use rusqlite::params;

use crate::database::{Database, fmt_ts, parse_enum, parse_ts, parse_ts_opt};
use crate::models::Lead;

const LEAD_COLUMNS: &str = "id, owner_id, name, email, email_is_placeholder, phone, source, \
     qualified, score, estimated_value, status, source_call_id, last_contacted_at, \
     converted_at, created_at";

fn lead_from_row(row: &rusqlite::Row<'_>) -> Result<Lead, rusqlite::Error> {
    Ok(Lead {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        email_is_placeholder: row.get(4)?,
        phone: row.get(5)?,
        source: row.get(6)?,
        qualified: row.get(7)?,
        score: row.get(8)?,
        estimated_value: row.get(9)?,
        status: parse_enum(10, &row.get::<_, String>(10)?)?,
        source_call_id: row.get(11)?,
        last_contacted_at: parse_ts_opt(12, row.get(12)?)?,
        converted_at: parse_ts_opt(13, row.get(13)?)?,
        created_at: parse_ts(14, &row.get::<_, String>(14)?)?,
    })
}

/// Create a lead for a call, or return the existing one.
///
/// The insert is `ON CONFLICT(source_call_id) DO NOTHING` followed by a
/// read-back in the same connection call, so the same call id always
/// yields exactly one stored lead.
pub async fn create_for_call(db: &Database, lead: &Lead) -> Result<Lead, CrewlineError> {
    let lead = lead.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO leads (id, owner_id, name, email, email_is_placeholder, phone,
                    source, qualified, score, estimated_value, status, source_call_id,
                    last_contacted_at, converted_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(source_call_id) DO NOTHING",
                params![
                    lead.id,
                    lead.owner_id,
                    lead.name,
                    lead.email,
                    lead.email_is_placeholder,
                    lead.phone,
                    lead.source,
                    lead.qualified,
                    lead.score,
                    lead.estimated_value,
                    lead.status.to_string(),
                    lead.source_call_id,
                    lead.last_contacted_at.map(fmt_ts),
                    lead.converted_at.map(fmt_ts),
                    fmt_ts(lead.created_at),
                ],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE source_call_id = ?1"
            ))?;
            stmt.query_row(params![lead.source_call_id], lead_from_row)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a lead by id.
pub async fn get_lead(db: &Database, id: &str) -> Result<Option<Lead>, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"))?;
            match stmt.query_row(params![id], lead_from_row) {
                Ok(lead) => Ok(Some(lead)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the lead derived from a given call, if any.
pub async fn find_by_source_call(
    db: &Database,
    call_id: &str,
) -> Result<Option<Lead>, CrewlineError> {
    let call_id = call_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads WHERE source_call_id = ?1"
            ))?;
            match stmt.query_row(params![call_id], lead_from_row) {
                Ok(lead) => Ok(Some(lead)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set a lead's lifecycle status.
///
/// Callers are responsible for only moving leads forward; the automation
/// evaluator checks the current status before calling this.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: LeadStatus,
) -> Result<(), CrewlineError> {
    let id = id.to_string();
    let qualified = status == LeadStatus::Qualified || status == LeadStatus::Converted;
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET status = ?2, qualified = MAX(qualified, ?3) WHERE id = ?1",
                params![id, status, qualified],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a lead converted, stamping `converted_at` and the realized value.
pub async fn mark_converted(
    db: &Database,
    id: &str,
    value: f64,
    converted_at: DateTime<Utc>,
) -> Result<(), CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET status = 'converted', qualified = 1,
                    estimated_value = ?2, converted_at = ?3
                 WHERE id = ?1",
                params![id, value, fmt_ts(converted_at)],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leads.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_lead(id: &str, call_id: &str) -> Lead {
        Lead {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            name: "Jane".to_string(),
            email: Lead::placeholder_email("+15551234567"),
            email_is_placeholder: true,
            phone: "+15551234567".to_string(),
            source: "sales".to_string(),
            qualified: false,
            score: None,
            estimated_value: None,
            status: LeadStatus::New,
            source_call_id: call_id.to_string(),
            last_contacted_at: None,
            converted_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_and_get_lead() {
        let (db, _dir) = setup_db().await;
        let created = create_for_call(&db, &make_lead("l1", "c1")).await.unwrap();
        assert_eq!(created.id, "l1");

        let lead = get_lead(&db, "l1").await.unwrap().unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.email_is_placeholder);
    }

    #[tokio::test]
    async fn same_call_never_duplicates() {
        let (db, _dir) = setup_db().await;
        let first = create_for_call(&db, &make_lead("l1", "c1")).await.unwrap();
        // A second creation attempt for the same call returns the stored row.
        let second = create_for_call(&db, &make_lead("l2", "c1")).await.unwrap();
        assert_eq!(first.id, second.id);

        let count: i64 = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM leads WHERE source_call_id = 'c1'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn update_status_sets_qualified_flag() {
        let (db, _dir) = setup_db().await;
        create_for_call(&db, &make_lead("l1", "c1")).await.unwrap();

        update_status(&db, "l1", LeadStatus::Qualified).await.unwrap();
        let lead = get_lead(&db, "l1").await.unwrap().unwrap();
        assert_eq!(lead.status, LeadStatus::Qualified);
        assert!(lead.qualified);

        // Moving to contacted later must not clear the qualified flag.
        update_status(&db, "l1", LeadStatus::Contacted).await.unwrap();
        let lead = get_lead(&db, "l1").await.unwrap().unwrap();
        assert!(lead.qualified);
    }

    #[tokio::test]
    async fn mark_converted_stamps_value_and_time() {
        let (db, _dir) = setup_db().await;
        create_for_call(&db, &make_lead("l1", "c1")).await.unwrap();

        let now = Utc::now();
        mark_converted(&db, "l1", 2500.0, now).await.unwrap();

        let lead = get_lead(&db, "l1").await.unwrap().unwrap();
        assert_eq!(lead.status, LeadStatus::Converted);
        assert_eq!(lead.estimated_value, Some(2500.0));
        assert!(lead.converted_at.is_some());
    }

    #[tokio::test]
    async fn find_by_source_call_misses_cleanly() {
        let (db, _dir) = setup_db().await;
        assert!(find_by_source_call(&db, "nope").await.unwrap().is_none());
    }
}
