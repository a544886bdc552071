// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session routing state and the session store.
//!
//! The store maps session keys to independently locked states. Sessions are
//! created on first use and dropped on session end; a turn holds its
//! session's lock for its whole duration, so turns for one session never
//! interleave while different sessions proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tiller_core::Category;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// The model in effect for a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveModel {
    /// The configured default model.
    #[default]
    Default,
    /// An explicitly selected model.
    Named(String),
}

impl ActiveModel {
    /// Builds an `ActiveModel`, collapsing the default model id onto the sentinel.
    pub fn from_id(model: &str, default_model: &str) -> Self {
        if model == default_model {
            ActiveModel::Default
        } else {
            ActiveModel::Named(model.to_string())
        }
    }

    /// Resolves the sentinel to a concrete model id.
    pub fn resolve<'a>(&'a self, default_model: &'a str) -> &'a str {
        match self {
            ActiveModel::Default => default_model,
            ActiveModel::Named(model) => model,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ActiveModel::Default)
    }
}

/// A suggestion awaiting the user's answer.
///
/// Holding the suggested model, category, and fallbacks in one optional value
/// means "pending" and "suggested model defined" cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSuggestion {
    pub model: String,
    pub category: Category,
    pub fallbacks: Vec<String>,
}

/// A revert waiting for the next turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArmedRevert {
    /// Unit of work whose completion armed the revert, if tracked.
    pub work_id: Option<String>,
}

/// Routing state for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Model currently in effect.
    pub current: ActiveModel,
    /// Outstanding suggestion, if any.
    pub pending: Option<PendingSuggestion>,
    /// Revert to deliver on the next turn, if any.
    pub revert: Option<ArmedRevert>,
    /// Unit of work tied to the current escalation.
    pub active_work_id: Option<String>,
    /// Category whose model list the current model came from.
    pub active_category: Option<Category>,
}

impl SessionState {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_revert_armed(&self) -> bool {
        self.revert.is_some()
    }

    /// Resets to the default model, dropping escalation bookkeeping.
    pub fn reset_to_default(&mut self) {
        self.current = ActiveModel::Default;
        self.active_work_id = None;
        self.active_category = None;
    }
}

/// Concurrent map from session key to exclusively owned session state.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the session's state, creating it on first use.
    ///
    /// The map guard is released before awaiting the session lock, so a slow
    /// turn never blocks other sessions.
    pub async fn lock(&self, session_key: &str) -> OwnedMutexGuard<SessionState> {
        let slot = self
            .sessions
            .entry(session_key.to_string())
            .or_default()
            .value()
            .clone();
        slot.lock_owned().await
    }

    /// Locks the session's state only if the session already exists.
    pub async fn lock_existing(&self, session_key: &str) -> Option<OwnedMutexGuard<SessionState>> {
        let slot = self.sessions.get(session_key).map(|s| s.value().clone())?;
        Some(slot.lock_owned().await)
    }

    /// Returns a copy of the session's state without creating it.
    pub async fn snapshot(&self, session_key: &str) -> Option<SessionState> {
        let slot = self.sessions.get(session_key).map(|s| s.value().clone())?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Drops the session's state. Returns false if the session was unknown.
    pub fn remove(&self, session_key: &str) -> bool {
        self.sessions.remove(session_key).is_some()
    }

    pub fn contains(&self, session_key: &str) -> bool {
        self.sessions.contains_key(session_key)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
