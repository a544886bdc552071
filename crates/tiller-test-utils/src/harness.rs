// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router harness for scenario tests.
//!
//! `RouterHarness` wires a `SessionRouter` to an in-memory ledger and the
//! mock collaborators, and offers one-line helpers for driving turns,
//! completions, and capacity errors.

use std::sync::Arc;

use tiller_config::model::{LedgerBackend, TillerConfig};
use tiller_core::{Category, EscalationEntry, EscalationLedger, HistoryMessage, TillerError};
use tiller_ledger::MemoryLedger;
use tiller_router::{CompletionSignal, Directive, SessionRouter, SessionState, SessionStore, Turn};

use crate::mocks::{FailingLedger, MockSemantic, MockTracker};

/// Builder for creating router test environments.
pub struct RouterHarnessBuilder {
    config: TillerConfig,
    semantic: Option<Arc<MockSemantic>>,
    tracker: Option<Arc<MockTracker>>,
    failing_ledger: bool,
}

impl RouterHarnessBuilder {
    fn new() -> Self {
        let mut config = TillerConfig::default();
        config.ledger.backend = LedgerBackend::Memory;
        Self {
            config,
            semantic: None,
            tracker: None,
            failing_ledger: false,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: TillerConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjust the configuration in place.
    pub fn configure(mut self, f: impl FnOnce(&mut TillerConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Enable the semantic slow path with the given mock.
    pub fn with_semantic(mut self, semantic: MockSemantic) -> Self {
        self.config.semantic.enabled = true;
        self.semantic = Some(Arc::new(semantic));
        self
    }

    /// Open units of work on approval through the given mock.
    pub fn with_tracker(mut self, tracker: MockTracker) -> Self {
        self.config.tracking.open_on_approval = true;
        self.tracker = Some(Arc::new(tracker));
        self
    }

    /// Use a ledger whose every operation fails.
    pub fn with_failing_ledger(mut self) -> Self {
        self.failing_ledger = true;
        self
    }

    /// Build the harness.
    pub fn build(self) -> Result<RouterHarness, TillerError> {
        let ledger = Arc::new(MemoryLedger::new());
        let router_ledger: Arc<dyn EscalationLedger> = if self.failing_ledger {
            Arc::new(FailingLedger)
        } else {
            ledger.clone()
        };

        let mut router = SessionRouter::new(self.config, SessionStore::new(), router_ledger)?;
        if let Some(semantic) = &self.semantic {
            router = router.with_semantic(semantic.clone());
        }
        if let Some(tracker) = &self.tracker {
            router = router.with_tracker(tracker.clone());
        }

        Ok(RouterHarness {
            router: Arc::new(router),
            ledger,
            semantic: self.semantic,
            tracker: self.tracker,
        })
    }
}

/// A router wired to in-memory and mock collaborators.
pub struct RouterHarness {
    /// The router under test.
    pub router: Arc<SessionRouter>,
    /// The in-memory ledger (unused by the router when built with a failing ledger).
    pub ledger: Arc<MemoryLedger>,
    /// The semantic mock, if enabled.
    pub semantic: Option<Arc<MockSemantic>>,
    /// The tracker mock, if enabled.
    pub tracker: Option<Arc<MockTracker>>,
}

impl RouterHarness {
    /// Create a new builder for configuring the harness.
    pub fn builder() -> RouterHarnessBuilder {
        RouterHarnessBuilder::new()
    }

    /// Drive one turn with no history.
    pub async fn turn(&self, session_key: &str, text: &str) -> Directive {
        self.router.on_turn(&Turn::new(session_key, text)).await
    }

    /// Drive one turn on a channel with history.
    pub async fn turn_with_history(
        &self,
        session_key: &str,
        channel: &str,
        text: &str,
        history: &[HistoryMessage],
    ) -> Directive {
        let turn = Turn::new(session_key, text)
            .with_channel(channel)
            .with_history(history);
        self.router.on_turn(&turn).await
    }

    /// Report that `work_id` was closed.
    pub async fn complete(&self, session_key: &str, work_id: &str) -> bool {
        self.router
            .on_completion(session_key, &CompletionSignal::Tracked(work_id.to_string()))
            .await
    }

    /// Report an uncorrelated completion.
    pub async fn complete_untracked(&self, session_key: &str) -> bool {
        self.router
            .on_completion(session_key, &CompletionSignal::Untracked)
            .await
    }

    /// Report a capacity error on the session's active model.
    pub async fn capacity_error(&self, session_key: &str) -> Option<Directive> {
        self.router
            .on_capacity_error(session_key, "429 Too Many Requests")
            .await
    }

    /// Record an escalation directly, as if approved in an earlier process.
    pub async fn seed_escalation(&self, work_id: &str, model: &str, session_key: &str) {
        let entry = EscalationEntry::new(work_id, model, Category::new("coding"), session_key);
        // MemoryLedger never fails.
        let _ = self.ledger.record(&entry).await;
    }

    /// Snapshot of the session's state.
    pub async fn state(&self, session_key: &str) -> Option<SessionState> {
        self.router.snapshot(session_key).await
    }
}
