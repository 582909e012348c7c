// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-call automation: a fixed battery of rules that turn call
//! outcomes into CRM tasks and lead transitions.

pub mod evaluator;
pub mod rules;

pub use evaluator::{AutomationSink, AutomationSummary, StorageSink, run_automations};
pub use rules::{LeadAction, RULES, RuleContext, RuleFire};
