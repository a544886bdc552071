// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing directives emitted by the session router.

use serde::Serialize;
use tiller_core::Category;

/// What the agent should do about its model on this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    /// Stay on the current model.
    Noop,
    /// Propose an upgrade and ask the user to approve it.
    Suggest {
        model: String,
        category: Category,
        fallbacks: Vec<String>,
    },
    /// The user approved; switch now.
    Switch {
        model: String,
        category: Category,
        /// Unit of work opened for this escalation, to be closed when done.
        work_id: Option<String>,
    },
    /// A peer agent was detected; switch to the complement without asking.
    AutoSwitch { model: String, peer_model: String },
    /// The active model hit a capacity limit; retry the failed call on `to`.
    Fallback { from: String, to: String },
    /// Tracked work finished; return to the default model.
    Revert {
        model: String,
        work_id: Option<String>,
    },
}

impl Directive {
    pub fn is_noop(&self) -> bool {
        matches!(self, Directive::Noop)
    }

    /// The model this directive moves the session to, if any.
    pub fn target_model(&self) -> Option<&str> {
        match self {
            Directive::Noop | Directive::Suggest { .. } => None,
            Directive::Switch { model, .. }
            | Directive::AutoSwitch { model, .. }
            | Directive::Revert { model, .. } => Some(model),
            Directive::Fallback { to, .. } => Some(to),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Noop => "noop",
            Directive::Suggest { .. } => "suggest",
            Directive::Switch { .. } => "switch",
            Directive::AutoSwitch { .. } => "auto_switch",
            Directive::Fallback { .. } => "fallback",
            Directive::Revert { .. } => "revert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let d = Directive::Fallback {
            from: "opus".into(),
            to: "sonnet".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "fallback");
        assert_eq!(json["to"], "sonnet");
        assert_eq!(
            serde_json::to_value(Directive::Noop).unwrap()["kind"],
            "noop"
        );
    }

    #[test]
    fn target_model_only_for_moves() {
        assert_eq!(Directive::Noop.target_model(), None);
        let revert = Directive::Revert {
            model: "flash".into(),
            work_id: None,
        };
        assert_eq!(revert.target_model(), Some("flash"));
        assert_eq!(revert.kind(), "revert");
    }
}
