// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Peer model detection and complement selection.
//!
//! Two agents sharing a text channel announce the model they run on with a
//! fixed marker (`[tiller] model: opus`). The detector finds the most recent
//! announcement by someone else and picks a model from the other family, so
//! the pair brings two perspectives to the same conversation.

use std::collections::BTreeMap;

use regex::Regex;
use tiller_config::model::CollaborationConfig;
use tiller_core::{HistoryMessage, TillerError};

/// Case-folds and strips every non-alphanumeric character.
///
/// `Gemini-2.5 Pro` and `gemini25pro` normalize to the same key.
pub fn normalize_model(model: &str) -> String {
    model
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Finds peer announcements and derives complement models.
#[derive(Debug, Clone)]
pub struct CollaborationDetector {
    pattern: Regex,
    window: usize,
    complements: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
    primary_markers: Vec<String>,
    primary_representative: String,
    secondary_representative: String,
}

impl CollaborationDetector {
    /// Compiles the announcement pattern from the configured marker.
    pub fn new(config: &CollaborationConfig) -> Result<Self, TillerError> {
        let pattern = format!(
            r"(?i){}\s*([A-Za-z0-9][A-Za-z0-9._:/-]*)",
            regex::escape(config.marker.trim())
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| TillerError::Config(format!("invalid collaboration marker: {e}")))?;

        Ok(Self {
            pattern,
            window: config.window,
            complements: config
                .complements
                .iter()
                .map(|(k, v)| (normalize_model(k), v.clone()))
                .collect(),
            aliases: config
                .aliases
                .iter()
                .map(|(k, v)| (normalize_model(k), normalize_model(v)))
                .collect(),
            primary_markers: config
                .families
                .primary_markers
                .iter()
                .map(|m| normalize_model(m))
                .filter(|m| !m.is_empty())
                .collect(),
            primary_representative: config.families.primary_representative.clone(),
            secondary_representative: config.families.secondary_representative.clone(),
        })
    }

    /// Returns the model token of the most recent peer announcement in the window.
    ///
    /// Messages authored by `own_identity` are skipped. Messages with no known
    /// author are considered, since the host may not attribute every message.
    pub fn find_peer_model(
        &self,
        recent: &[HistoryMessage],
        own_identity: Option<&str>,
    ) -> Option<String> {
        recent
            .iter()
            .rev()
            .take(self.window)
            .filter(|msg| match (own_identity, msg.author.as_deref()) {
                (Some(own), Some(author)) => !author.trim().eq_ignore_ascii_case(own.trim()),
                _ => true,
            })
            .find_map(|msg| self.announced_model(&msg.text))
    }

    /// The model token announced in `text`, taking the last announcement if several.
    pub fn announced_model(&self, text: &str) -> Option<String> {
        self.pattern
            .captures_iter(text)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_end_matches(['.', ':']).to_string())
            .filter(|m| !m.is_empty())
    }

    /// Picks a model that complements the peer's `model`.
    ///
    /// Lookup order: complement table, alias table, then the family heuristic.
    /// Total over every input with at least one alphanumeric character.
    pub fn complement_of(&self, model: &str) -> Option<String> {
        let key = normalize_model(model);
        if key.is_empty() {
            return None;
        }

        if let Some(direct) = self.complements.get(&key) {
            return Some(direct.clone());
        }

        if let Some(via_alias) = self
            .aliases
            .get(&key)
            .and_then(|alias| self.complements.get(alias))
        {
            return Some(via_alias.clone());
        }

        let primary_family = self.primary_markers.iter().any(|m| key.contains(m.as_str()));
        Some(if primary_family {
            self.secondary_representative.clone()
        } else {
            self.primary_representative.clone()
        })
    }
}
