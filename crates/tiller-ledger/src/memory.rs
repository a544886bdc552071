// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local escalation ledger.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tiller_core::{EscalationEntry, EscalationLedger, TillerError};
use tokio::sync::RwLock;

/// Escalation ledger held in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: RwLock<BTreeMap<String, EscalationEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl EscalationLedger for MemoryLedger {
    async fn record(&self, entry: &EscalationEntry) -> Result<(), TillerError> {
        self.entries
            .write()
            .await
            .insert(entry.work_id.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        Ok(self.entries.read().await.get(work_id).cloned())
    }

    async fn remove(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        Ok(self.entries.write().await.remove(work_id))
    }

    async fn list(&self) -> Result<Vec<EscalationEntry>, TillerError> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}
