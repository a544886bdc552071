// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion and capacity-error detection from observed tool calls.

use serde_json::Value;
use tiller_config::model::{FallbackConfig, TrackingConfig};
use tiller_router::CompletionSignal;

/// Characters that end a shell command segment.
const SEPARATORS: &[char] = &[';', '&', '|', '\n', '>', '<', ')', '`'];

/// Classifies tool calls as completions or capacity errors.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    completion_tools: Vec<String>,
    close_command: String,
    capacity_patterns: Vec<String>,
}

impl SignalDetector {
    pub fn new(tracking: &TrackingConfig, fallback: &FallbackConfig) -> Self {
        Self {
            completion_tools: tracking
                .completion_tools
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            close_command: tracking.close_command.trim().to_string(),
            capacity_patterns: fallback
                .capacity_patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// The error text names a capacity or rate limit.
    pub fn is_capacity_error(&self, error: &str) -> bool {
        let lower = error.to_lowercase();
        self.capacity_patterns.iter().any(|p| lower.contains(p.as_str()))
    }

    /// Extracts completion signals from a successful tool call.
    ///
    /// Returns an empty list when the call did not close any work. A close
    /// command naming no id yields a single [`CompletionSignal::Untracked`].
    pub fn completions(
        &self,
        tool: &str,
        arguments: &Value,
        result: Option<&Value>,
        error: Option<&str>,
    ) -> Vec<CompletionSignal> {
        if error.is_some_and(|e| !e.trim().is_empty()) || failed(result) {
            return Vec::new();
        }
        let tool = tool.trim().to_lowercase();
        if self.close_command.is_empty() || !self.completion_tools.contains(&tool) {
            return Vec::new();
        }
        let Some(command) = command_of(arguments) else {
            return Vec::new();
        };
        if !command.contains(&self.close_command) {
            return Vec::new();
        }

        let mut ids: Vec<String> = Vec::new();
        for key in ["work_id", "id"] {
            if let Some(id) = arguments.get(key).and_then(Value::as_str) {
                push_unique(&mut ids, id);
            }
        }
        for (start, _) in command.match_indices(&self.close_command) {
            let rest = &command[start + self.close_command.len()..];
            for id in ids_after_close(rest) {
                push_unique(&mut ids, id);
            }
        }

        if ids.is_empty() {
            vec![CompletionSignal::Untracked]
        } else {
            ids.into_iter().map(CompletionSignal::Tracked).collect()
        }
    }
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    let id = id.trim();
    if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

/// The command string of a shell-like tool call.
fn command_of(arguments: &Value) -> Option<&str> {
    match arguments {
        Value::String(s) => Some(s),
        Value::Object(map) => ["command", "cmd", "script"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str)),
        _ => None,
    }
}

/// A tool result reporting a non-zero exit code is not a completion.
fn failed(result: Option<&Value>) -> bool {
    result
        .and_then(|r| r.get("exit_code").or_else(|| r.get("exitCode")))
        .and_then(Value::as_i64)
        .is_some_and(|code| code != 0)
}

/// Work ids following a close command, up to the first flag or separator.
fn ids_after_close(rest: &str) -> Vec<&str> {
    // "bd close" must not match "bd closed".
    if rest.starts_with(|c: char| c.is_alphanumeric()) {
        return Vec::new();
    }
    let segment = rest.split(SEPARATORS).next().unwrap_or("");
    segment
        .split_whitespace()
        .take_while(|tok| !tok.starts_with('-'))
        .map(|tok| tok.trim_matches(|c: char| c == '"' || c == '\'' || c == ','))
        .filter(|tok| !tok.is_empty())
        .collect()
}
