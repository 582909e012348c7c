// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook gateway: HTTP surface plus the call-event ingestion pipeline.

pub mod handlers;
pub mod pipeline;
pub mod server;

pub use pipeline::{CallEvent, Pipeline, WebhookOutcome};
pub use server::{AppState, ServerConfig, router, start_server};
