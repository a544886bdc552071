// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hook wire protocol: one JSON object per line in, one per line out.
//!
//! ```json
//! {"id": 1, "event": "turn_start", "session_key": "s1", "text": "go ahead", "history": []}
//! {"id": 2, "event": "tool_call", "session_key": "s1", "tool": "bash",
//!  "arguments": {"command": "bd close W1"}, "result": {"exit_code": 0}}
//! {"id": 3, "event": "session_end", "session_key": "s1"}
//! ```
//!
//! Responses echo the request id: `{"id": 1, "directive": "..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tiller_core::{HistoryMessage, TillerError};

/// An event delivered by the host runtime.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HookEvent {
    /// A new turn is starting; a directive may be prepended to it.
    TurnStart {
        session_key: String,
        #[serde(default)]
        channel: Option<String>,
        text: String,
        #[serde(default)]
        history: Vec<HistoryMessage>,
    },
    /// The agent invoked a tool.
    ToolCall {
        session_key: String,
        tool: String,
        #[serde(default)]
        arguments: Value,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    /// The session is over; its state can be released.
    SessionEnd { session_key: String },
}

impl HookEvent {
    pub fn session_key(&self) -> &str {
        match self {
            HookEvent::TurnStart { session_key, .. }
            | HookEvent::ToolCall { session_key, .. }
            | HookEvent::SessionEnd { session_key } => session_key,
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::TurnStart { .. } => "turn_start",
            HookEvent::ToolCall { .. } => "tool_call",
            HookEvent::SessionEnd { .. } => "session_end",
        }
    }
}

/// One decoded request line.
#[derive(Debug, Clone, PartialEq)]
pub struct HookRequest {
    /// Opaque correlation id, echoed back verbatim.
    pub id: Option<Value>,
    pub event: HookEvent,
}

impl HookRequest {
    /// Decodes a request line.
    ///
    /// On failure the id is still returned when the line was a JSON object
    /// carrying one, so the error response can be correlated.
    pub fn parse(line: &str) -> Result<Self, (Option<Value>, TillerError)> {
        let value: Value = serde_json::from_str(line).map_err(|e| (None, TillerError::from(e)))?;
        let id = value.get("id").filter(|v| !v.is_null()).cloned();
        match serde_json::from_value::<HookEvent>(value) {
            Ok(event) => Ok(Self { id, event }),
            Err(e) => Err((id, TillerError::from(e))),
        }
    }
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResponse {
    pub id: Option<Value>,
    /// Instructions to hand to the agent, or `null` for none.
    pub directive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookResponse {
    pub fn directive(id: Option<Value>, directive: Option<String>) -> Self {
        Self {
            id,
            directive,
            error: None,
        }
    }

    pub fn error(id: Option<Value>, error: impl Into<String>) -> Self {
        Self {
            id,
            directive: None,
            error: Some(error.into()),
        }
    }
}
