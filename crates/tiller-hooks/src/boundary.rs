// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host-facing hook handlers.
//!
//! Every entry point is total: router errors and panics are logged and turned
//! into "no directive" so a routing fault can never break the host's turn.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tiller_config::TillerConfig;
use tiller_core::{HistoryMessage, TillerError};
use tiller_router::{SessionRouter, Turn};
use tracing::{debug, error, info};

use crate::events::HookEvent;
use crate::render::DirectiveRenderer;
use crate::signals::SignalDetector;

/// Adapts host events to [`SessionRouter`] operations.
#[derive(Clone)]
pub struct RouterHooks {
    router: Arc<SessionRouter>,
    signals: SignalDetector,
    renderer: DirectiveRenderer,
}

impl RouterHooks {
    pub fn new(router: Arc<SessionRouter>, config: &TillerConfig) -> Self {
        Self {
            router,
            signals: SignalDetector::new(&config.tracking, &config.fallback),
            renderer: DirectiveRenderer::new(config),
        }
    }

    pub fn router(&self) -> &Arc<SessionRouter> {
        &self.router
    }

    /// Dispatches one event. Returns text to inject into the agent's context.
    pub async fn handle(&self, event: &HookEvent) -> Option<String> {
        match event {
            HookEvent::TurnStart {
                session_key,
                channel,
                text,
                history,
            } => {
                self.on_turn_start(session_key, channel.as_deref(), text, history)
                    .await
            }
            HookEvent::ToolCall {
                session_key,
                tool,
                arguments,
                result,
                error,
            } => {
                self.on_tool_call(session_key, tool, arguments, result.as_ref(), error.as_deref())
                    .await
            }
            HookEvent::SessionEnd { session_key } => {
                self.on_session_end(session_key).await;
                None
            }
        }
    }

    /// Routes a turn and renders the resulting directive.
    pub async fn on_turn_start(
        &self,
        session_key: &str,
        channel: Option<&str>,
        text: &str,
        history: &[HistoryMessage],
    ) -> Option<String> {
        guarded("turn_start", session_key, async {
            require_key(session_key)?;
            let mut turn = Turn::new(session_key, text).with_history(history);
            if let Some(channel) = channel {
                turn = turn.with_channel(channel);
            }
            let directive = self.router.on_turn(&turn).await;
            if !directive.is_noop() {
                info!(session_key, directive = directive.kind(), "routing directive");
            }
            Ok(self.renderer.render(&directive))
        })
        .await
    }

    /// Observes a tool call.
    ///
    /// A capacity error yields a fallback directive for the retry. A close
    /// command is reported as a completion; its revert arrives with the next
    /// turn, so nothing is returned for it.
    pub async fn on_tool_call(
        &self,
        session_key: &str,
        tool: &str,
        arguments: &Value,
        result: Option<&Value>,
        error: Option<&str>,
    ) -> Option<String> {
        guarded("tool_call", session_key, async {
            require_key(session_key)?;

            if let Some(message) = error
                && self.signals.is_capacity_error(message)
            {
                let directive = self.router.on_capacity_error(session_key, message).await;
                return Ok(directive.and_then(|d| self.renderer.render(&d)));
            }

            // Every id is reported so each closed item leaves the ledger.
            let mut armed = false;
            for signal in self.signals.completions(tool, arguments, result, error) {
                armed |= self.router.on_completion(session_key, &signal).await;
            }
            if armed {
                debug!(session_key, "revert armed for next turn");
            }
            Ok(None)
        })
        .await
    }

    /// Releases the session's routing state.
    pub async fn on_session_end(&self, session_key: &str) {
        guarded("session_end", session_key, async {
            require_key(session_key)?;
            self.router.end_session(session_key);
            Ok(None)
        })
        .await;
    }
}

fn require_key(session_key: &str) -> Result<(), TillerError> {
    if session_key.trim().is_empty() {
        return Err(TillerError::Internal("event has an empty session_key".to_string()));
    }
    Ok(())
}

/// Runs a hook body, logging and swallowing errors and panics.
async fn guarded<F>(hook: &'static str, session_key: &str, body: F) -> Option<String>
where
    F: Future<Output = Result<Option<String>, TillerError>>,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            error!(hook, session_key, error = %e, "hook failed");
            None
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(hook, session_key, panic = message.as_str(), "hook panicked");
            debug!(hook, "continuing without a directive");
            None
        }
    }
}
