// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0
#![feature(int_roundings)]

//! Core library for the Crewline call pipeline.
//!
//! Provides the shared error type and the domain model (calls, leads,
//! tasks, usage ledgers, agents, workflow trigger rules) used throughout
//! the workspace.

pub mod error;
pub mod types;

pub use error::CrewlineError;
pub use types::{
    Agent, CallDirection, CallRecord, CallStatus, ExtractedData, Lead, LeadStatus, PlanTier,
    Sentiment, Task, TaskOrigin, TaskPriority, TaskStatus, TaskType, TriggerConditions,
    UsageLedger, WorkflowTriggerRule, billed_minutes,
};
