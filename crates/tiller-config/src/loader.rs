// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tiller.toml` > `~/.config/tiller/tiller.toml` > `/etc/tiller/tiller.toml`
//! with environment variable overrides via `TILLER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TillerConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/tiller/tiller.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "tiller.toml";

/// Path of the per-user configuration file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tiller").join("tiller.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tiller/tiller.toml` (system-wide)
/// 3. `~/.config/tiller/tiller.toml` (user XDG config)
/// 4. `./tiller.toml` (local directory)
/// 5. `TILLER_*` environment variables
pub fn load_config() -> Result<TillerConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and inline configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TillerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TillerConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TillerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TillerConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TillerConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TILLER_ROUTING_DEFAULT_MODEL` must map to
/// `routing.default_model`, not `routing.default.model`.
fn env_provider() -> Env {
    Env::prefixed("TILLER_").map(|key| map_env_key(key.as_str()).into())
}

/// Sections whose env var prefix is replaced by a dotted path.
const ENV_SECTIONS: &[&str] = &[
    "agent",
    "routing",
    "triggers",
    "collaboration",
    "semantic",
    "ledger",
    "tracking",
    "fallback",
];

/// Map a lowercased, prefix-stripped env var name to a dotted config key.
fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_keep_underscores_in_field_names() {
        assert_eq!(map_env_key("routing_default_model"), "routing.default_model");
        assert_eq!(map_env_key("semantic_api_key"), "semantic.api_key");
        assert_eq!(map_env_key("tracking_open_on_approval"), "tracking.open_on_approval");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }
}
