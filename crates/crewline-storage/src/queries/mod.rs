// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod agents;
pub mod calls;
pub mod leads;
pub mod tasks;
pub mod triggers;
pub mod usage;
pub mod users;
