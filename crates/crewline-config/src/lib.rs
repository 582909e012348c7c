// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Crewline service.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.

#![allow(clippy::result_large_err)]

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CrewlineConfig;

use crewline_core::CrewlineError;

/// Load configuration from the XDG hierarchy and validate it.
///
/// High-level entry point: loads config from TOML files + env vars via
/// Figment, then runs post-deserialization validation.
pub fn load_and_validate() -> Result<CrewlineConfig, CrewlineError> {
    let config = loader::load_config().map_err(|e| CrewlineError::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<CrewlineConfig, CrewlineError> {
    let config =
        loader::load_config_from_str(toml_content).map_err(|e| CrewlineError::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Post-deserialization validation of constraints serde cannot express.
fn validate(config: &CrewlineConfig) -> Result<(), CrewlineError> {
    if config.billing.rate_per_minute < 0.0 {
        return Err(CrewlineError::Config(format!(
            "billing.rate_per_minute must be non-negative, got {}",
            config.billing.rate_per_minute
        )));
    }
    if config.workflow.dispatch_timeout_secs == 0 {
        return Err(CrewlineError::Config(
            "workflow.dispatch_timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.storage.database_path.is_empty() {
        return Err(CrewlineError::Config(
            "storage.database_path must not be empty".to_string(),
        ));
    }
    Ok(())
}
