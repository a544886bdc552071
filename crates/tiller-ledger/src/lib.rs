// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation ledger backends for the tiller model router.
//!
//! - [`JsonFileLedger`]: one JSON document, shareable with other tools
//! - [`SqliteLedger`]: SQLite via tokio-rusqlite with refinery migrations
//! - [`MemoryLedger`]: process-local, for tests and ephemeral runs
//!
//! [`open_ledger`] picks a backend from [`LedgerConfig`].

pub mod json_file;
pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;

use tiller_config::model::{LedgerBackend, LedgerConfig};
use tiller_core::{EscalationLedger, TillerError};

pub use json_file::JsonFileLedger;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

/// Opens the configured ledger backend.
pub async fn open_ledger(config: &LedgerConfig) -> Result<Arc<dyn EscalationLedger>, TillerError> {
    let ledger: Arc<dyn EscalationLedger> = match config.backend {
        LedgerBackend::Json => Arc::new(JsonFileLedger::new(&config.path)),
        LedgerBackend::Sqlite => Arc::new(SqliteLedger::open(&config.path).await?),
        LedgerBackend::Memory => Arc::new(MemoryLedger::new()),
    };
    tracing::debug!(backend = %config.backend, path = config.path.as_str(), "escalation ledger ready");
    Ok(ledger)
}
