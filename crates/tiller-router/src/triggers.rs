// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phrase triggers for the approval handshake.

use tiller_config::model::TriggerConfig;

/// Returns true when `text` contains any phrase, ignoring case.
///
/// Empty phrases never match.
pub fn matches_any<S: AsRef<str>>(text: &str, phrases: &[S]) -> bool {
    let lower = text.to_lowercase();
    phrases.iter().any(|p| {
        let p = p.as_ref().trim();
        !p.is_empty() && lower.contains(&p.to_lowercase())
    })
}

/// The three independent phrase lists, lowercased once at construction.
///
/// Lists may overlap; the router decides which check runs first.
#[derive(Debug, Clone)]
pub struct TriggerSet {
    approve: Vec<String>,
    r#override: Vec<String>,
    stay: Vec<String>,
}

fn normalized(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

impl TriggerSet {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            approve: normalized(&config.approve),
            r#override: normalized(&config.r#override),
            stay: normalized(&config.stay),
        }
    }

    /// The text approves a pending suggestion.
    pub fn is_approval(&self, text: &str) -> bool {
        matches_any(text, &self.approve)
    }

    /// The text declines a pending suggestion.
    pub fn is_override(&self, text: &str) -> bool {
        matches_any(text, &self.r#override)
    }

    /// The text asks to keep the upgraded model after completion.
    pub fn is_stay(&self, text: &str) -> bool {
        matches_any(text, &self.stay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case() {
        assert!(matches_any("Sure, GO AHEAD then", &["go ahead"]));
        assert!(matches_any("go ahead", &["Go Ahead"]));
        assert!(!matches_any("go on", &["go ahead"]));
    }

    #[test]
    fn empty_phrases_never_match() {
        assert!(!matches_any("anything", &["", "  "]));
        assert!(!matches_any("anything", &[] as &[&str]));
    }

    #[test]
    fn lists_are_independent() {
        let triggers = TriggerSet::new(&TriggerConfig::default());
        assert!(triggers.is_approval("yes please"));
        assert!(!triggers.is_override("yes please"));
        assert!(triggers.is_override("no switch for now"));
        assert!(triggers.is_stay("let's stay on this model"));
        assert!(!triggers.is_stay("go ahead"));
    }

    #[test]
    fn one_text_may_satisfy_several_lists() {
        let triggers = TriggerSet::new(&TriggerConfig::default());
        let text = "no switch, but go ahead";
        assert!(triggers.is_override(text));
        assert!(triggers.is_approval(text));
    }
}
