// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as unique category names, non-empty phrase lists, and positive timeouts.

use std::collections::HashSet;

use tiller_core::SIMPLE_CATEGORY;

use crate::diagnostic::ConfigError;
use crate::model::{LedgerBackend, TillerConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TillerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.routing.default_model.trim().is_empty() {
        fail("routing.default_model must not be empty".to_string());
    }

    let mut seen_names = HashSet::new();
    for (i, rule) in config.routing.categories.iter().enumerate() {
        let name = rule.name.trim();
        if name.is_empty() {
            fail(format!("routing.categories[{i}].name must not be empty"));
            continue;
        }
        if name == SIMPLE_CATEGORY {
            fail(format!(
                "routing.categories[{i}]: `{SIMPLE_CATEGORY}` is the implicit fallback and must not be listed"
            ));
        }
        if !seen_names.insert(name) {
            fail(format!("duplicate category name `{name}` in [[routing.categories]]"));
        }
        if rule.signals.iter().all(|s| s.trim().is_empty()) {
            fail(format!("routing.categories[{i}] (`{name}`) needs at least one signal"));
        }
        if rule.models.iter().any(|m| m.trim().is_empty()) {
            fail(format!("routing.categories[{i}] (`{name}`) has an empty model id"));
        }
    }

    for (list, phrases) in [
        ("triggers.approve", &config.triggers.approve),
        ("triggers.override", &config.triggers.r#override),
        ("triggers.stay", &config.triggers.stay),
    ] {
        if phrases.iter().all(|p| p.trim().is_empty()) {
            fail(format!("{list} must contain at least one phrase"));
        }
    }

    if config.collaboration.window == 0 {
        fail("collaboration.window must be at least 1".to_string());
    }
    if config.collaboration.marker.trim().is_empty() {
        fail("collaboration.marker must not be empty".to_string());
    }

    if config.semantic.timeout_ms == 0 {
        fail("semantic.timeout_ms must be at least 1".to_string());
    }
    if config.semantic.enabled && config.semantic.endpoint.trim().is_empty() {
        fail("semantic.endpoint must be set when semantic.enabled = true".to_string());
    }

    if config.ledger.backend != LedgerBackend::Memory && config.ledger.path.trim().is_empty() {
        fail(format!(
            "ledger.path must not be empty for the `{}` backend",
            config.ledger.backend
        ));
    }

    if config.tracking.open_on_approval {
        if config.tracking.program.trim().is_empty() {
            fail("tracking.program must be set when tracking.open_on_approval = true".to_string());
        }
        if !config.tracking.create_args.iter().any(|a| a.contains("{title}")) {
            fail("tracking.create_args must contain a `{title}` placeholder".to_string());
        }
    }
    if config.tracking.timeout_ms == 0 {
        fail("tracking.timeout_ms must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
