// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Crewline service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Crewline configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrewlineConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Billing rate settings.
    #[serde(default)]
    pub billing: BillingConfig,

    /// External workflow engine settings.
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "crewline.db".to_string()
}

/// Billing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Per-minute platform rate in USD applied to every recorded call.
    #[serde(default = "default_rate_per_minute")]
    pub rate_per_minute: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            rate_per_minute: default_rate_per_minute(),
        }
    }
}

fn default_rate_per_minute() -> f64 {
    0.15
}

/// External workflow engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Base URL of the external workflow engine. `None` disables dispatch.
    #[serde(default)]
    pub engine_url: Option<String>,

    /// Bearer token for engine authentication. `None` sends no auth header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Timeout applied to each workflow dispatch call, in seconds.
    /// Timeouts count as dispatch failures.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            engine_url: None,
            api_key: None,
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CrewlineConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.database_path, "crewline.db");
        assert!((config.billing.rate_per_minute - 0.15).abs() < f64::EPSILON);
        assert!(config.workflow.engine_url.is_none());
        assert_eq!(config.workflow.dispatch_timeout_secs, 10);
    }
}
