// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for tiller integration tests.
//!
//! Provides mock collaborators and a router harness for fast,
//! deterministic tests without network access or a real issue tracker.
//!
//! # Components
//!
//! - [`MockSemantic`] - semantic classifier with a queue of canned labels
//! - [`MockTracker`] - work tracker handing out sequential ids
//! - [`FailingLedger`] - ledger whose every operation fails
//! - [`RouterHarness`] - a `SessionRouter` wired to the mocks

pub mod harness;
pub mod mocks;

pub use harness::{RouterHarness, RouterHarnessBuilder};
pub use mocks::{FailingLedger, MockSemantic, MockTracker};
