// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External unit-of-work tracker trait (issue tracker, ticket system).

use async_trait::async_trait;

use crate::error::TillerError;

/// Opens units of work in an external tracker.
///
/// Closing is observed, not performed: the agent closes the work item through
/// its own tool calls and the hook boundary reports the completion.
#[async_trait]
pub trait WorkTracker: Send + Sync {
    /// Opens a unit of work titled `title` and returns its identifier.
    async fn open(&self, title: &str) -> Result<String, TillerError>;
}
