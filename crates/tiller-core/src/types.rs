// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the router, the ledger backends, and the hook boundary.

use serde::{Deserialize, Serialize};

/// Name of the category that never warrants an upgrade.
pub const SIMPLE_CATEGORY: &str = "simple";

/// A task category a turn's text is sorted into.
///
/// The set of categories is configuration-defined; `simple` is always a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Creates a category from its configured name.
    pub fn new(name: impl Into<String>) -> Self {
        Category(name.into())
    }

    /// The fallback category that requires no upgrade.
    pub fn simple() -> Self {
        Category(SIMPLE_CATEGORY.to_string())
    }

    /// Returns true for the `simple` category.
    pub fn is_simple(&self) -> bool {
        self.0 == SIMPLE_CATEGORY
    }

    /// The category name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the running conversation history seen by the turn-start hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who wrote the message (agent identity or user name), when the host knows it.
    #[serde(default)]
    pub author: Option<String>,
    /// Plain text content.
    pub text: String,
}

impl HistoryMessage {
    /// Creates a message with a known author.
    pub fn from_author(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            text: text.into(),
        }
    }

    /// Creates a message with no attributable author.
    pub fn anonymous(text: impl Into<String>) -> Self {
        Self {
            author: None,
            text: text.into(),
        }
    }
}

/// A durable record correlating an external unit of work with an approved escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationEntry {
    /// Identifier of the unit of work (issue/ticket id).
    pub work_id: String,
    /// Model the session escalated to.
    pub model: String,
    /// Category that triggered the escalation.
    pub category: Category,
    /// Session that approved the escalation.
    pub session_key: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl EscalationEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(
        work_id: impl Into<String>,
        model: impl Into<String>,
        category: Category,
        session_key: impl Into<String>,
    ) -> Self {
        Self {
            work_id: work_id.into(),
            model: model.into(),
            category,
            session_key: session_key.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
