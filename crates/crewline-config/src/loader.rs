// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./crewline.toml` > `~/.config/crewline/crewline.toml`
//! > `/etc/crewline/crewline.toml` with environment variable overrides via
//! the `CREWLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CrewlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/crewline/crewline.toml` (system-wide)
/// 3. `~/.config/crewline/crewline.toml` (user XDG config)
/// 4. `./crewline.toml` (local directory)
/// 5. `CREWLINE_*` environment variables
pub fn load_config() -> Result<CrewlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrewlineConfig::default()))
        .merge(Toml::file("/etc/crewline/crewline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("crewline/crewline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("crewline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CrewlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrewlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CrewlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrewlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CREWLINE_STORAGE_DATABASE_PATH` must
/// map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("CREWLINE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("billing_", "billing.", 1)
            .replacen("workflow_", "workflow.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_from_empty_string() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.port, 8090);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [server]
            port = 9000

            [billing]
            rate_per_minute = 0.25

            [workflow]
            engine_url = "http://localhost:5678"
            dispatch_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert!((config.billing.rate_per_minute - 0.25).abs() < f64::EPSILON);
        assert_eq!(
            config.workflow.engine_url.as_deref(),
            Some("http://localhost:5678")
        );
        assert_eq!(config.workflow.dispatch_timeout_secs, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [server]
            prot = 9000
            "#,
        );
        assert!(result.is_err(), "typo'd key should be rejected");
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crewline.toml");
        std::fs::write(&path, "[storage]\ndatabase_path = \"/tmp/test.db\"\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.storage.database_path, "/tmp/test.db");
    }
}
