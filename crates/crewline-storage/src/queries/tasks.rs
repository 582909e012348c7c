// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task persistence.

use crewline_core::{CrewlineError, TaskStatus};
use rusqlite::params;

use crate::database::{Database, fmt_ts, parse_enum, parse_ts, parse_ts_opt};
use crate::models::Task;

const TASK_COLUMNS: &str = "id, owner_id, title, description, task_type, status, priority, \
     due_at, lead_id, call_id, created_by, agent_id, completed_at, created_at";

fn task_from_row(row: &rusqlite::Row<'_>) -> Result<Task, rusqlite::Error> {
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        task_type: parse_enum(4, &row.get::<_, String>(4)?)?,
        status: parse_enum(5, &row.get::<_, String>(5)?)?,
        priority: parse_enum(6, &row.get::<_, String>(6)?)?,
        due_at: parse_ts_opt(7, row.get(7)?)?,
        lead_id: row.get(8)?,
        call_id: row.get(9)?,
        created_by: parse_enum(10, &row.get::<_, String>(10)?)?,
        agent_id: row.get(11)?,
        completed_at: parse_ts_opt(12, row.get(12)?)?,
        created_at: parse_ts(13, &row.get::<_, String>(13)?)?,
    })
}

/// Insert a new task.
pub async fn insert_task(db: &Database, task: &Task) -> Result<(), CrewlineError> {
    let task = task.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, owner_id, title, description, task_type, status,
                    priority, due_at, lead_id, call_id, created_by, agent_id, completed_at,
                    created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    task.id,
                    task.owner_id,
                    task.title,
                    task.description,
                    task.task_type.to_string(),
                    task.status.to_string(),
                    task.priority.to_string(),
                    task.due_at.map(fmt_ts),
                    task.lead_id,
                    task.call_id,
                    task.created_by.to_string(),
                    task.agent_id,
                    task.completed_at.map(fmt_ts),
                    fmt_ts(task.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a task by id.
pub async fn get_task(db: &Database, id: &str) -> Result<Option<Task>, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
            match stmt.query_row(params![id], task_from_row) {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all tasks created for a given call, oldest first.
pub async fn list_for_call(db: &Database, call_id: &str) -> Result<Vec<Task>, CrewlineError> {
    let call_id = call_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE call_id = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![call_id], task_from_row)?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row?);
            }
            Ok(tasks)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a task's status.
///
/// `completed_at` is stamped iff the new status is completed, and cleared
/// whenever the task leaves the completed state.
pub async fn update_status(db: &Database, id: &str, status: TaskStatus) -> Result<(), CrewlineError> {
    let id = id.to_string();
    let completed = status == TaskStatus::Completed;
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = ?2,
                    completed_at = CASE WHEN ?3
                        THEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                        ELSE NULL END
                 WHERE id = ?1",
                params![id, status, completed],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crewline_core::{TaskOrigin, TaskPriority, TaskType};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_task(id: &str, call_id: &str) -> Task {
        Task {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            title: "Follow up with Jane".to_string(),
            description: Some("Qualified on the call".to_string()),
            task_type: TaskType::FollowUp,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            due_at: Some(Utc::now() + Duration::hours(24)),
            lead_id: Some("l1".to_string()),
            call_id: Some(call_id.to_string()),
            created_by: TaskOrigin::VoiceAgent,
            agent_id: Some("agent-1".to_string()),
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        insert_task(&db, &make_task("t1", "c1")).await.unwrap();

        let task = get_task(&db, "t1").await.unwrap().unwrap();
        assert_eq!(task.task_type, TaskType::FollowUp);
        assert_eq!(task.created_by, TaskOrigin::VoiceAgent);
        assert!(task.due_at.is_some());
        assert!(task.completed_at.is_none());
    }

    #[tokio::test]
    async fn list_for_call_orders_oldest_first() {
        let (db, _dir) = setup_db().await;
        let mut t1 = make_task("t1", "c1");
        t1.created_at = Utc::now() - Duration::minutes(5);
        insert_task(&db, &t1).await.unwrap();
        insert_task(&db, &make_task("t2", "c1")).await.unwrap();
        insert_task(&db, &make_task("t3", "other-call")).await.unwrap();

        let tasks = list_for_call(&db, "c1").await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "t1");
        assert_eq!(tasks[1].id, "t2");
    }

    #[tokio::test]
    async fn completed_at_follows_status() {
        let (db, _dir) = setup_db().await;
        insert_task(&db, &make_task("t1", "c1")).await.unwrap();

        update_status(&db, "t1", TaskStatus::Completed).await.unwrap();
        let task = get_task(&db, "t1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());

        // Reopening clears the completion stamp.
        update_status(&db, "t1", TaskStatus::InProgress).await.unwrap();
        let task = get_task(&db, "t1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.completed_at.is_none());
    }
}
