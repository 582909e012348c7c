// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage metering: one ledger row per owner per calendar month.
//!
//! The meter is a thin orchestration over the atomic storage operations:
//! get-or-create the month row, then apply the call in one UPDATE that
//! recomputes overage from the plan formulas.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crewline_core::{CrewlineError, PlanTier, UsageLedger};
use crewline_storage::{Database, queries};
use tracing::info;

use crate::plans;

/// Calendar month key for a timestamp, "YYYY-MM".
pub fn month_key(t: DateTime<Utc>) -> String {
    t.format("%Y-%m").to_string()
}

/// Per-owner usage meter backed by the shared database.
pub struct UsageMeter {
    db: Arc<Database>,
}

impl UsageMeter {
    /// Create a meter over the shared database handle.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the owner's ledger for the month containing `now`, creating it
    /// lazily on the first call of the month.
    pub async fn get_or_create_for_month(
        &self,
        owner_id: &str,
        plan: PlanTier,
        now: DateTime<Utc>,
    ) -> Result<UsageLedger, CrewlineError> {
        let month = month_key(now);
        queries::usage::get_or_create(
            &self.db,
            owner_id,
            &month,
            plan,
            plans::limits(plan).included_minutes,
            now,
        )
        .await
    }

    /// Add one call's minutes and cost to the owner's current-month ledger.
    ///
    /// Ensures the row exists first, then applies the atomic add-call
    /// update with the plan's overage rate.
    pub async fn record_call(
        &self,
        owner_id: &str,
        plan: PlanTier,
        minutes: i64,
        cost: f64,
        now: DateTime<Utc>,
    ) -> Result<UsageLedger, CrewlineError> {
        self.get_or_create_for_month(owner_id, plan, now).await?;

        let month = month_key(now);
        let rate = plans::limits(plan).overage_rate_per_minute;
        let ledger = queries::usage::add_call(&self.db, owner_id, &month, minutes, cost, rate, now)
            .await?
            .ok_or_else(|| {
                CrewlineError::Internal(format!(
                    "usage ledger vanished for owner {owner_id} month {month}"
                ))
            })?;

        info!(
            owner_id,
            month = %ledger.month,
            minutes,
            minutes_used = ledger.minutes_used,
            minutes_overage = ledger.minutes_overage,
            overage_charge = ledger.overage_charge,
            "usage recorded"
        );

        Ok(ledger)
    }
}
