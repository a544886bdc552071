// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the tiller model router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level tiller configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TillerConfig {
    /// Agent identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Default model and the ordered category catalog.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Approval / override / stay phrase lists.
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Cooperation with a peer agent on a shared channel.
    #[serde(default)]
    pub collaboration: CollaborationConfig,

    /// Slow-path semantic classifier.
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Escalation ledger backend.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Unit-of-work tracking and completion detection.
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Capacity-error fallback cascade.
    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// Agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "tiller".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Model catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Enable routing. When false, every turn yields no directive.
    #[serde(default = "default_routing_enabled")]
    pub enabled: bool,

    /// Model in effect when nothing has been escalated.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Ordered category rules, most specific first. The first rule with a
    /// matching signal wins; `simple` is implied and must not be listed.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: default_routing_enabled(),
            default_model: default_model(),
            categories: default_categories(),
        }
    }
}

impl RoutingConfig {
    /// Returns the configured model list for `category`, if the category exists.
    pub fn models_for(&self, category: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|rule| rule.name == category)
            .map(|rule| rule.models.as_slice())
    }
}

/// One classification rule: a category, its signals, and its model list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    /// Category name (e.g. "coding").
    pub name: String,

    /// Case-insensitive substrings that select this category.
    #[serde(default)]
    pub signals: Vec<String>,

    /// Primary model first, remaining entries are fallbacks. Empty means "no upgrade".
    #[serde(default)]
    pub models: Vec<String>,
}

fn default_routing_enabled() -> bool {
    true
}

fn default_model() -> String {
    "gemini-flash".to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            name: "security-audit".to_string(),
            signals: strings(&[
                "security audit",
                "security review",
                "vulnerability",
                "vulnerabilities",
                "cve-",
                "pentest",
                "penetration test",
                "threat model",
                "exploit",
                "sql injection",
                "xss",
                "csrf",
                "privilege escalation",
            ]),
            models: strings(&["opus", "sonnet"]),
        },
        CategoryRule {
            name: "coding".to_string(),
            signals: strings(&[
                "```",
                "refactor",
                "implement",
                "function",
                "debug",
                "stack trace",
                "compile error",
                "unit test",
                "write code",
                "code review",
                "pull request",
                "bug",
            ]),
            models: strings(&["sonnet", "gemini-pro"]),
        },
        CategoryRule {
            name: "complex".to_string(),
            signals: strings(&[
                "architecture",
                "orchestrate",
                "orchestration",
                "multi-step",
                "migration plan",
                "design a system",
                "distributed",
                "across the codebase",
                "end-to-end",
            ]),
            models: strings(&["opus", "sonnet", "gemini-pro"]),
        },
        CategoryRule {
            name: "moderate".to_string(),
            signals: strings(&[
                "make a plan",
                "planning",
                "roadmap",
                "compare",
                "trade-off",
                "tradeoff",
                "pros and cons",
                "analyze",
                "analyse",
                "summarize",
                "outline",
            ]),
            models: strings(&["gemini-pro"]),
        },
    ]
}

/// Phrase lists for the approval handshake.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    /// Phrases approving a pending suggestion.
    #[serde(default = "default_approve")]
    pub approve: Vec<String>,

    /// Phrases declining a pending suggestion (stay on the current model).
    #[serde(default = "default_override")]
    pub r#override: Vec<String>,

    /// Phrases keeping the upgraded model after tracked work completes.
    #[serde(default = "default_stay")]
    pub stay: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            approve: default_approve(),
            r#override: default_override(),
            stay: default_stay(),
        }
    }
}

fn default_approve() -> Vec<String> {
    strings(&[
        "go ahead",
        "approve",
        "yes",
        "do it",
        "sounds good",
        "proceed",
        "switch to",
        "let's switch",
    ])
}

fn default_override() -> Vec<String> {
    strings(&[
        "no switch",
        "don't switch",
        "dont switch",
        "do not switch",
        "keep current",
        "no upgrade",
        "not now",
    ])
}

fn default_stay() -> Vec<String> {
    strings(&[
        "stay on",
        "keep using",
        "don't revert",
        "dont revert",
        "do not revert",
    ])
}

/// Collaboration with a peer agent sharing a text channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollaborationConfig {
    /// Enable complement selection.
    #[serde(default)]
    pub enabled: bool,

    /// Only sessions on this channel are collaborative. `None` means every session.
    #[serde(default)]
    pub channel: Option<String>,

    /// Own identity; announcements authored by it are never treated as a peer's.
    #[serde(default)]
    pub identity: Option<String>,

    /// Textual marker preceding the model token in an announcement.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Number of recent messages scanned for a peer announcement.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Normalized peer model -> complement model.
    #[serde(default = "default_complements")]
    pub complements: BTreeMap<String, String>,

    /// Normalized alias -> normalized complement-table key.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,

    /// Coarse family heuristic used when no table entry matches.
    #[serde(default)]
    pub families: FamilyConfig,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel: None,
            identity: None,
            marker: default_marker(),
            window: default_window(),
            complements: default_complements(),
            aliases: default_aliases(),
            families: FamilyConfig::default(),
        }
    }
}

fn default_marker() -> String {
    "[tiller] model:".to_string()
}

fn default_window() -> usize {
    12
}

fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn default_complements() -> BTreeMap<String, String> {
    pairs(&[
        ("opus", "gemini-pro"),
        ("sonnet", "gemini-pro"),
        ("haiku", "gemini-flash"),
        ("geminipro", "opus"),
        ("geminiflash", "sonnet"),
    ])
}

fn default_aliases() -> BTreeMap<String, String> {
    pairs(&[
        ("claudeopus", "opus"),
        ("claudesonnet", "sonnet"),
        ("claudehaiku", "haiku"),
        ("gemini25pro", "geminipro"),
        ("gemini25flash", "geminiflash"),
    ])
}

/// Two-family complement heuristic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FamilyConfig {
    /// Substrings (normalized) identifying the primary family.
    #[serde(default = "default_primary_markers")]
    pub primary_markers: Vec<String>,

    /// Returned when the peer is outside the primary family.
    #[serde(default = "default_primary_representative")]
    pub primary_representative: String,

    /// Returned when the peer belongs to the primary family.
    #[serde(default = "default_secondary_representative")]
    pub secondary_representative: String,
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            primary_markers: default_primary_markers(),
            primary_representative: default_primary_representative(),
            secondary_representative: default_secondary_representative(),
        }
    }
}

fn default_primary_markers() -> Vec<String> {
    strings(&["claude", "opus", "sonnet", "haiku", "anthropic"])
}

fn default_primary_representative() -> String {
    "sonnet".to_string()
}

fn default_secondary_representative() -> String {
    "gemini-pro".to_string()
}

/// Semantic classifier (slow path) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SemanticConfig {
    /// Consult the semantic classifier when no keyword rule matched.
    #[serde(default)]
    pub enabled: bool,

    /// OpenAI-compatible chat-completions endpoint.
    #[serde(default = "default_semantic_endpoint")]
    pub endpoint: String,

    /// API key sent as a bearer token. `None` sends no authorization header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for classification.
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Minimum text length (in characters) before the slow path is tried.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Hard deadline for one classification call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_semantic_endpoint(),
            api_key: None,
            model: default_semantic_model(),
            min_chars: default_min_chars(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_semantic_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_semantic_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_min_chars() -> usize {
    80
}

fn default_timeout_ms() -> u64 {
    2500
}

/// Where escalation entries are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LedgerBackend {
    /// A single JSON document on disk.
    Json,
    /// A SQLite database.
    Sqlite,
    /// Process memory only (nothing survives a restart).
    Memory,
}

/// Escalation ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Storage backend.
    #[serde(default = "default_ledger_backend")]
    pub backend: LedgerBackend,

    /// File path for the `json` and `sqlite` backends.
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: default_ledger_backend(),
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_backend() -> LedgerBackend {
    LedgerBackend::Json
}

fn default_ledger_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tiller").join("escalations.json"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "escalations.json".to_string())
}

/// How completion signals are correlated with escalations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrackingMode {
    /// Completions name a unit of work that is looked up in the ledger.
    Tracked,
    /// Any completion arms a revert when a non-default model is active.
    Untracked,
}

/// Unit-of-work tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrackingConfig {
    /// Correlation mode for completion signals.
    #[serde(default = "default_tracking_mode")]
    pub mode: TrackingMode,

    /// Open a unit of work in the external tracker when a suggestion is approved.
    #[serde(default)]
    pub open_on_approval: bool,

    /// Tracker executable.
    #[serde(default = "default_tracker_program")]
    pub program: String,

    /// Arguments for creating a unit of work; `{title}` is substituted.
    #[serde(default = "default_create_args")]
    pub create_args: Vec<String>,

    /// Hard deadline for one tracker invocation, in milliseconds.
    #[serde(default = "default_tracker_timeout_ms")]
    pub timeout_ms: u64,

    /// Tool names whose calls may close a unit of work.
    #[serde(default = "default_completion_tools")]
    pub completion_tools: Vec<String>,

    /// Command prefix that closes a unit of work (e.g. `bd close`).
    #[serde(default = "default_close_command")]
    pub close_command: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            mode: default_tracking_mode(),
            open_on_approval: false,
            program: default_tracker_program(),
            create_args: default_create_args(),
            timeout_ms: default_tracker_timeout_ms(),
            completion_tools: default_completion_tools(),
            close_command: default_close_command(),
        }
    }
}

fn default_tracking_mode() -> TrackingMode {
    TrackingMode::Tracked
}

fn default_tracker_program() -> String {
    "bd".to_string()
}

fn default_create_args() -> Vec<String> {
    strings(&["create", "{title}", "--silent"])
}

fn default_tracker_timeout_ms() -> u64 {
    5000
}

fn default_completion_tools() -> Vec<String> {
    strings(&["bash", "shell"])
}

fn default_close_command() -> String {
    "bd close".to_string()
}

/// Capacity-error fallback configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackConfig {
    /// Case-insensitive substrings identifying a capacity / rate-limit error.
    #[serde(default = "default_capacity_patterns")]
    pub capacity_patterns: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            capacity_patterns: default_capacity_patterns(),
        }
    }
}

fn default_capacity_patterns() -> Vec<String> {
    strings(&[
        "429",
        "rate limit",
        "rate_limit",
        "ratelimit",
        "too many requests",
        "overloaded",
        "quota",
        "resource_exhausted",
        "capacity",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_ordered_most_specific_first() {
        let routing = RoutingConfig::default();
        let names: Vec<&str> = routing.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["security-audit", "coding", "complex", "moderate"]);
    }

    #[test]
    fn models_for_returns_primary_first() {
        let routing = RoutingConfig::default();
        assert_eq!(
            routing.models_for("coding"),
            Some(["sonnet".to_string(), "gemini-pro".to_string()].as_slice())
        );
        assert!(routing.models_for("simple").is_none());
    }

    #[test]
    fn ledger_backend_parses_lowercase() {
        use std::str::FromStr;
        assert_eq!(LedgerBackend::from_str("sqlite").unwrap(), LedgerBackend::Sqlite);
        assert_eq!(LedgerBackend::Json.to_string(), "json");
        assert_eq!(TrackingMode::Untracked.to_string(), "untracked");
    }
}
