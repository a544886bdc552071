// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Narrow interfaces to the router's external collaborators.
//!
//! Every collaborator performs potentially blocking I/O and uses
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod ledger;
pub mod semantic;
pub mod tracker;

pub use ledger::EscalationLedger;
pub use semantic::SemanticClassifier;
pub use tracker::WorkTracker;
