// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation ledger trait for durable work-id to escalation mappings.

use async_trait::async_trait;

use crate::error::TillerError;
use crate::types::EscalationEntry;

/// Durable mapping from unit-of-work id to the escalation it belongs to.
///
/// Shared between concurrently running sessions. Implementations must make
/// `record` and `remove` read-modify-write safe so a concurrent write is never
/// lost, and must keep at most one entry per `work_id`.
#[async_trait]
pub trait EscalationLedger: Send + Sync {
    /// Stores `entry`, replacing any existing entry with the same work id.
    async fn record(&self, entry: &EscalationEntry) -> Result<(), TillerError>;

    /// Looks up the entry for `work_id`.
    async fn get(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError>;

    /// Removes and returns the entry for `work_id`, if present.
    async fn remove(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError>;

    /// Returns every live entry, ordered by work id.
    async fn list(&self) -> Result<Vec<EscalationEntry>, TillerError>;
}
