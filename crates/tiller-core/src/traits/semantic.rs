// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slow-path semantic classifier trait.

use async_trait::async_trait;

use crate::error::TillerError;
use crate::types::Category;

/// A classifier consulted only when no keyword rule matched.
///
/// The returned label is untrusted: the router validates it against the
/// closed category set and discards anything else.
#[async_trait]
pub trait SemanticClassifier: Send + Sync {
    /// Returns the raw category label the classifier chose for `text`.
    async fn classify(&self, text: &str, categories: &[Category]) -> Result<String, TillerError>;
}
