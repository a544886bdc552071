// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the tiller model router.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use tiller_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("default model: {}", config.routing.default_model);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TillerConfig;

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<TillerConfig, Vec<ConfigError>> {
    checked(loader::load_config(), collect_toml_sources)
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<TillerConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<TillerConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates a loaded config, or converts the load failure into diagnostics.
///
/// Sources are only read back on failure, to resolve spans.
fn checked(
    loaded: Result<TillerConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<TillerConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string(loader::LOCAL_CONFIG_FILE) {
        let path = std::env::current_dir()
            .map(|d| d.join(loader::LOCAL_CONFIG_FILE).display().to_string())
            .unwrap_or_else(|_| loader::LOCAL_CONFIG_FILE.to_string());
        sources.push((path, content));
    }

    if let Some(path) = loader::user_config_path()
        && let Ok(content) = std::fs::read_to_string(&path)
    {
        sources.push((path.display().to_string(), content));
    }

    if let Ok(content) = std::fs::read_to_string(loader::SYSTEM_CONFIG_PATH) {
        sources.push((loader::SYSTEM_CONFIG_PATH.to_string(), content));
    }

    sources
}
