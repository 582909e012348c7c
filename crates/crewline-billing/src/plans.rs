// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static plan limit table and overage math.
//!
//! The table is a pure lookup, not configuration: every tier's included
//! minutes and overage rate are fixed at compile time. Trial carries a
//! zero overage rate so trialing users can never accrue surprise charges.

use crewline_core::PlanTier;

/// Per-tier billing limits.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    /// Minutes included in the monthly allowance.
    pub included_minutes: i64,
    /// USD charged per minute beyond the allowance.
    pub overage_rate_per_minute: f64,
}

/// Look up the limits for a plan tier.
pub fn limits(tier: PlanTier) -> PlanLimits {
    match tier {
        PlanTier::Trial => PlanLimits {
            included_minutes: 30,
            overage_rate_per_minute: 0.0,
        },
        PlanTier::Starter => PlanLimits {
            included_minutes: 300,
            overage_rate_per_minute: 0.35,
        },
        PlanTier::Professional => PlanLimits {
            included_minutes: 1000,
            overage_rate_per_minute: 0.30,
        },
        PlanTier::Enterprise => PlanLimits {
            included_minutes: 3000,
            overage_rate_per_minute: 0.25,
        },
    }
}

/// Overage minutes for a given usage against an allowance.
pub fn overage_minutes(minutes_used: i64, minutes_included: i64) -> i64 {
    (minutes_used - minutes_included).max(0)
}

/// Overage charge in USD for a plan and usage.
pub fn overage_charge(tier: PlanTier, minutes_used: i64, minutes_included: i64) -> f64 {
    overage_minutes(minutes_used, minutes_included) as f64
        * limits(tier).overage_rate_per_minute
}
