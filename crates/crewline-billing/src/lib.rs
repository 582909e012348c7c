// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plan limits and usage metering for Crewline.
//!
//! The plan table is static; the meter applies per-call usage to the
//! owner's monthly ledger through the atomic storage operations.

pub mod meter;
pub mod plans;

pub use meter::{UsageMeter, month_key};
pub use plans::{PlanLimits, limits, overage_charge, overage_minutes};
