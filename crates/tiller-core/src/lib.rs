// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the tiller model router.
//!
//! This crate provides the error type, the shared data types, and the narrow
//! collaborator traits (escalation ledger, semantic classifier, work tracker)
//! that the routing core depends on. Concrete I/O lives in sibling crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TillerError;
pub use types::{Category, EscalationEntry, HistoryMessage, SIMPLE_CATEGORY};

pub use traits::{EscalationLedger, SemanticClassifier, WorkTracker};
