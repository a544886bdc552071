// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session routing state machine.
//!
//! Per-turn decision order (first match wins):
//! 1. armed revert (or a `stay` phrase cancelling it)
//! 2. collaboration auto-switch
//! 3. pending suggestion + override phrase
//! 4. pending suggestion + approval phrase
//! 5. pending suggestion, ambiguous answer
//! 6. classify and maybe suggest
//!
//! Completions and capacity errors arrive out of band, between turns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tiller_config::model::{TillerConfig, TrackingMode};
use tiller_core::{
    Category, EscalationEntry, EscalationLedger, HistoryMessage, SemanticClassifier, TillerError,
    WorkTracker,
};
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::collaboration::CollaborationDetector;
use crate::directive::Directive;
use crate::state::{ActiveModel, ArmedRevert, PendingSuggestion, SessionState, SessionStore};
use crate::triggers::TriggerSet;

/// Deadline for a single ledger operation.
const LEDGER_TIMEOUT: Duration = Duration::from_secs(5);

/// One inbound turn as seen by the turn-start hook.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub session_key: &'a str,
    /// Shared channel the session lives on, if the host reports one.
    pub channel: Option<&'a str>,
    /// Latest user text.
    pub text: &'a str,
    /// Running conversation history, oldest first.
    pub history: &'a [HistoryMessage],
}

impl<'a> Turn<'a> {
    pub fn new(session_key: &'a str, text: &'a str) -> Self {
        Self {
            session_key,
            channel: None,
            text,
            history: &[],
        }
    }

    pub fn with_channel(mut self, channel: &'a str) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_history(mut self, history: &'a [HistoryMessage]) -> Self {
        self.history = history;
        self
    }
}

/// An observed completion of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionSignal {
    /// A specific unit of work was closed.
    Tracked(String),
    /// Work finished with no correlation id.
    Untracked,
}

/// Owns the routing decisions for every session.
pub struct SessionRouter {
    config: TillerConfig,
    store: SessionStore,
    ledger: Arc<dyn EscalationLedger>,
    tracker: Option<Arc<dyn WorkTracker>>,
    classifier: Classifier,
    triggers: TriggerSet,
    detector: CollaborationDetector,
}

impl SessionRouter {
    /// Creates a router over `store`, recording escalations in `ledger`.
    pub fn new(
        config: TillerConfig,
        store: SessionStore,
        ledger: Arc<dyn EscalationLedger>,
    ) -> Result<Self, TillerError> {
        let classifier = Classifier::new(&config.routing);
        let triggers = TriggerSet::new(&config.triggers);
        let detector = CollaborationDetector::new(&config.collaboration)?;
        Ok(Self {
            config,
            store,
            ledger,
            tracker: None,
            classifier,
            triggers,
            detector,
        })
    }

    /// Enables the semantic slow path of the classifier.
    pub fn with_semantic(mut self, semantic: Arc<dyn SemanticClassifier>) -> Self {
        let semantic_config = self.config.semantic.clone();
        self.classifier = self.classifier.with_semantic(semantic, &semantic_config);
        self
    }

    /// Opens units of work on approval through `tracker`.
    pub fn with_tracker(mut self, tracker: Arc<dyn WorkTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn config(&self) -> &TillerConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn default_model(&self) -> &str {
        &self.config.routing.default_model
    }

    fn is_collaborative(&self, turn: &Turn<'_>) -> bool {
        let collab = &self.config.collaboration;
        collab.enabled
            && match collab.channel.as_deref() {
                None => true,
                Some(wanted) => turn.channel == Some(wanted),
            }
    }

    fn own_identity(&self) -> &str {
        self.config
            .collaboration
            .identity
            .as_deref()
            .unwrap_or(&self.config.agent.name)
    }

    /// Decides the directive for one turn and updates the session's state.
    pub async fn on_turn(&self, turn: &Turn<'_>) -> Directive {
        if !self.config.routing.enabled {
            return Directive::Noop;
        }

        let key = turn.session_key;
        let mut state = self.store.lock(key).await;

        if let Some(revert) = state.revert.take() {
            if self.triggers.is_stay(turn.text) {
                state.active_work_id = None;
                info!(
                    session_key = key,
                    model = state.current.resolve(self.default_model()),
                    "revert cancelled, staying on upgraded model"
                );
                return Directive::Noop;
            }
            state.reset_to_default();
            info!(
                session_key = key,
                work_id = revert.work_id.as_deref().unwrap_or("-"),
                "reverting to default model"
            );
            return Directive::Revert {
                model: self.default_model().to_string(),
                work_id: revert.work_id,
            };
        }

        if self.is_collaborative(turn)
            && let Some(peer_model) = self
                .detector
                .find_peer_model(turn.history, Some(self.own_identity()))
        {
            return self.collaborate(key, &mut state, peer_model);
        }

        if let Some(pending) = state.pending.take() {
            if self.triggers.is_override(turn.text) {
                info!(
                    session_key = key,
                    model = pending.model.as_str(),
                    "suggestion declined"
                );
                return Directive::Noop;
            }
            if self.triggers.is_approval(turn.text) {
                return self.approve(key, &mut state, pending).await;
            }
            debug!(session_key = key, "suggestion still pending");
            state.pending = Some(pending);
            return Directive::Noop;
        }

        self.suggest(key, &mut state, turn.text).await
    }

    fn collaborate(&self, key: &str, state: &mut SessionState, peer_model: String) -> Directive {
        let Some(complement) = self.detector.complement_of(&peer_model) else {
            return Directive::Noop;
        };
        if complement == state.current.resolve(self.default_model()) {
            debug!(
                session_key = key,
                peer_model = peer_model.as_str(),
                "already on complement model"
            );
            return Directive::Noop;
        }

        state.current = ActiveModel::from_id(&complement, self.default_model());
        state.active_category = None;
        state.pending = None;
        info!(
            session_key = key,
            peer_model = peer_model.as_str(),
            model = complement.as_str(),
            "collaboration auto-switch"
        );
        Directive::AutoSwitch {
            model: complement,
            peer_model,
        }
    }

    async fn approve(
        &self,
        key: &str,
        state: &mut SessionState,
        pending: PendingSuggestion,
    ) -> Directive {
        state.current = ActiveModel::from_id(&pending.model, self.default_model());
        state.active_category = Some(pending.category.clone());
        state.active_work_id = self.open_work(key, &pending).await;

        info!(
            session_key = key,
            model = pending.model.as_str(),
            category = %pending.category,
            work_id = state.active_work_id.as_deref().unwrap_or("-"),
            "suggestion approved"
        );
        Directive::Switch {
            model: pending.model,
            category: pending.category,
            work_id: state.active_work_id.clone(),
        }
    }

    /// Opens and records a unit of work for an approved escalation.
    ///
    /// Any failure is logged and the approval proceeds untracked.
    async fn open_work(&self, key: &str, pending: &PendingSuggestion) -> Option<String> {
        let tracking = &self.config.tracking;
        if !tracking.open_on_approval || tracking.mode != TrackingMode::Tracked {
            return None;
        }
        let tracker = self.tracker.as_ref()?;

        let title = format!("{} work on {}", pending.category, pending.model);
        let limit = Duration::from_millis(tracking.timeout_ms);
        let work_id = match with_deadline(limit, tracker.open(&title)).await {
            Ok(id) => id,
            Err(e) => {
                warn!(session_key = key, error = %e, "could not open unit of work");
                return None;
            }
        };

        let entry = EscalationEntry::new(
            work_id.clone(),
            pending.model.clone(),
            pending.category.clone(),
            key,
        );
        if let Err(e) = with_deadline(LEDGER_TIMEOUT, self.ledger.record(&entry)).await {
            warn!(
                session_key = key,
                work_id = work_id.as_str(),
                error = %e,
                "escalation not recorded, completion will not revert"
            );
        }
        Some(work_id)
    }

    async fn suggest(&self, key: &str, state: &mut SessionState, text: &str) -> Directive {
        let result = self.classifier.classify_turn(text).await;
        if result.category.is_simple() {
            return Directive::Noop;
        }

        let Some((primary, fallbacks)) = self
            .config
            .routing
            .models_for(result.category.as_str())
            .and_then(|models| models.split_first())
        else {
            debug!(session_key = key, category = %result.category, "category has no upgrade");
            return Directive::Noop;
        };

        if primary == state.current.resolve(self.default_model()) {
            return Directive::Noop;
        }

        let pending = PendingSuggestion {
            model: primary.clone(),
            category: result.category,
            fallbacks: fallbacks.to_vec(),
        };
        info!(
            session_key = key,
            model = pending.model.as_str(),
            category = %pending.category,
            source = ?result.source,
            "suggesting model upgrade"
        );
        let directive = Directive::Suggest {
            model: pending.model.clone(),
            category: pending.category.clone(),
            fallbacks: pending.fallbacks.clone(),
        };
        state.pending = Some(pending);
        directive
    }

    /// Handles a completion observed after a turn. Returns true if a revert was armed.
    ///
    /// The revert itself is delivered on the session's next turn. A revert
    /// that is already armed is kept, so closing several items at once still
    /// removes every matching escalation. Completions for sessions the router
    /// has never seen are ignored.
    pub async fn on_completion(&self, session_key: &str, signal: &CompletionSignal) -> bool {
        let Some(mut state) = self.store.lock_existing(session_key).await else {
            debug!(session_key, "completion for unknown session");
            return false;
        };

        let work_id = match (self.config.tracking.mode, signal) {
            (TrackingMode::Tracked, CompletionSignal::Tracked(id)) => id,
            _ => return arm_untracked(session_key, &mut state, None),
        };

        let entry = match with_deadline(LEDGER_TIMEOUT, self.ledger.get(work_id)).await {
            Ok(Some(entry)) => entry,
            Ok(None) if state.active_work_id.is_none() => {
                // Escalated without a tracked item: any close ends the work.
                return arm_untracked(session_key, &mut state, Some(work_id));
            }
            Ok(None) => {
                debug!(session_key, work_id = work_id.as_str(), "completion for unknown work id");
                return false;
            }
            Err(e) => {
                warn!(session_key, error = %e, "ledger unavailable, ignoring completion");
                return false;
            }
        };

        if entry.model != state.current.resolve(self.default_model()) {
            debug!(
                session_key,
                work_id = work_id.as_str(),
                recorded = entry.model.as_str(),
                "model changed since escalation, not reverting"
            );
            return false;
        }

        if let Err(e) = with_deadline(LEDGER_TIMEOUT, self.ledger.remove(work_id)).await {
            warn!(session_key, work_id = work_id.as_str(), error = %e, "could not remove escalation");
        }
        if state.current.is_default() {
            return false;
        }

        if state.revert.is_none() {
            state.revert = Some(ArmedRevert {
                work_id: Some(work_id.clone()),
            });
        }
        info!(session_key, work_id = work_id.as_str(), "work completed, revert armed");
        true
    }

    /// Cascades to the next model after a capacity error.
    ///
    /// Returns `None` when the chain is exhausted or the current model is in
    /// no chain; the caller must then surface the original error.
    pub async fn on_capacity_error(&self, session_key: &str, error: &str) -> Option<Directive> {
        let Some(mut state) = self.store.lock_existing(session_key).await else {
            warn!(session_key, error, "capacity error for unknown session");
            return None;
        };
        let from = state.current.resolve(self.default_model()).to_string();

        let Some((category, chain)) = self.fallback_chain(&state, &from) else {
            warn!(session_key, model = from.as_str(), error, "no fallback chain for model");
            return None;
        };

        let next = chain
            .iter()
            .position(|m| *m == from)
            .and_then(|i| chain.get(i + 1));
        let Some(to) = next else {
            warn!(session_key, model = from.as_str(), error, "fallback chain exhausted");
            return None;
        };

        let to = to.clone();
        state.current = ActiveModel::from_id(&to, self.default_model());
        state.active_category = Some(category);
        info!(
            session_key,
            from = from.as_str(),
            to = to.as_str(),
            "capacity error, falling back"
        );
        Some(Directive::Fallback { from, to })
    }

    /// The active category's model list if it contains `model`, else the
    /// first configured list that does.
    fn fallback_chain(&self, state: &SessionState, model: &str) -> Option<(Category, &[String])> {
        let routing = &self.config.routing;
        if let Some(category) = &state.active_category
            && let Some(models) = routing.models_for(category.as_str())
            && models.iter().any(|m| m == model)
        {
            return Some((category.clone(), models));
        }
        routing
            .categories
            .iter()
            .find(|rule| rule.models.iter().any(|m| m == model))
            .map(|rule| (Category::new(rule.name.clone()), rule.models.as_slice()))
    }

    /// Releases the session's state. Returns false if the session was unknown.
    pub fn end_session(&self, session_key: &str) -> bool {
        let removed = self.store.remove(session_key);
        if removed {
            debug!(session_key, "session ended");
        }
        removed
    }

    /// A copy of the session's state, for inspection.
    pub async fn snapshot(&self, session_key: &str) -> Option<SessionState> {
        self.store.snapshot(session_key).await
    }
}

async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, TillerError>>,
) -> Result<T, TillerError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TillerError::Timeout { duration: limit })?
}

/// Arms a revert for a completion that no ledger entry vouches for.
/// Sessions already on the default model have nothing to revert.
fn arm_untracked(session_key: &str, state: &mut SessionState, work_id: Option<&String>) -> bool {
    if state.current.is_default() {
        return false;
    }
    if state.revert.is_none() {
        state.revert = Some(ArmedRevert {
            work_id: work_id.cloned(),
        });
    }
    info!(
        session_key,
        work_id = work_id.map_or("-", String::as_str),
        "untracked completion, revert armed"
    );
    true
}
