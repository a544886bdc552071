// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped model routing for the tiller agent runtime.
//!
//! This crate provides:
//! - [`Classifier`]: ordered keyword-signal classification with an optional semantic slow path
//! - [`TriggerSet`]: approval / override / stay phrase matching
//! - [`CollaborationDetector`]: peer announcement detection and complement selection
//! - [`SessionStore`]: concurrent per-session state with create-on-use, drop-on-end lifecycle
//! - [`SessionRouter`]: the state machine turning turns, completions, and
//!   capacity errors into [`Directive`]s
//!
//! The router never fails a turn. Collaborator errors are logged and degrade
//! to staying on the current (or default) model.

pub mod classifier;
pub mod collaboration;
pub mod directive;
pub mod router;
pub mod state;
pub mod triggers;

pub use classifier::{ClassificationResult, ClassificationSource, Classifier};
pub use collaboration::{normalize_model, CollaborationDetector};
pub use directive::Directive;
pub use router::{CompletionSignal, SessionRouter, Turn};
pub use state::{ActiveModel, ArmedRevert, PendingSuggestion, SessionState, SessionStore};
pub use triggers::{matches_any, TriggerSet};
