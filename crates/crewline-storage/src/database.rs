// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use chrono::{DateTime, Utc};
use crewline_core::CrewlineError;
use tracing::debug;

/// Handle to the single SQLite connection used by the whole process.
///
/// Opening runs all pending migrations and configures WAL mode. Query
/// modules accept `&Database` and go through [`Database::connection`].
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, configure PRAGMAs, and run
    /// embedded migrations.
    pub async fn open(path: &str) -> Result<Self, CrewlineError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CrewlineError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| CrewlineError::Storage {
                source: Box::new(e),
            })?;

        debug!(path, "database opened, migrations applied");
        Ok(Self { conn })
    }

    /// Access the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL before shutdown.
    pub async fn close(&self) -> Result<(), CrewlineError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into CrewlineError::Storage.
///
/// Concrete over `rusqlite::Error` so query closures that end in `?` on
/// rusqlite calls have their error type fully determined by this mapping.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CrewlineError {
    CrewlineError::Storage {
        source: Box::new(e),
    }
}

/// Format a timestamp for storage (ISO-8601 UTC with millisecond precision).
pub(crate) fn fmt_ts(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parse a stored timestamp back into a `DateTime<Utc>`.
pub(crate) fn parse_ts(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse an optional stored timestamp.
pub(crate) fn parse_ts_opt(
    idx: usize,
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    s.map(|s| parse_ts(idx, &s)).transpose()
}

/// Parse a stored enum string (strum snake_case form) back into its type.
pub(crate) fn parse_enum<T>(idx: usize, s: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
