// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch of call events to a user-configured external workflow engine.

pub mod engine;
pub mod matcher;

pub use engine::{DisabledEngine, HttpWorkflowEngine, WorkflowEngine, WorkflowPayload};
pub use matcher::{DispatchSummary, match_and_dispatch};
