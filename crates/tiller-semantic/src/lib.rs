// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic slow-path classifier for the tiller model router.
//!
//! [`HttpSemanticClassifier`] asks a small chat model to pick one category
//! from the closed set when no keyword rule matched. The router validates
//! the answer and enforces its own deadline, so this crate only has to
//! report failures, never recover from them.

pub mod client;
pub mod types;

pub use client::HttpSemanticClassifier;
