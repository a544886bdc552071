// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation ledger backed by SQLite.
//!
//! Entries live in the `escalations` table (created by the V1 migration),
//! keyed by work id. `INSERT OR REPLACE` gives idempotent overwrite-by-key;
//! every statement runs on tokio-rusqlite's single background thread, so
//! concurrent sessions are serialized by the database connection.

use std::path::Path;

use async_trait::async_trait;
use tiller_core::{Category, EscalationEntry, EscalationLedger, TillerError};
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into `TillerError::Ledger`.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TillerError {
    TillerError::ledger("sqlite ledger query failed", e)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EscalationEntry> {
    Ok(EscalationEntry {
        work_id: row.get(0)?,
        model: row.get(1)?,
        category: Category::new(row.get::<_, String>(2)?),
        session_key: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Persistent escalation ledger backed by SQLite.
pub struct SqliteLedger {
    conn: tokio_rusqlite::Connection,
}

impl SqliteLedger {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TillerError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TillerError::ledger(format!("cannot create {}", parent.display()), e)
            })?;
        }

        let migrate_path = path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = rusqlite::Connection::open(&migrate_path)
                .map_err(|e| TillerError::ledger("cannot open sqlite ledger", e))?;
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| TillerError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| TillerError::ledger("cannot open sqlite ledger", e))?;

        info!(path = %path.display(), "sqlite escalation ledger opened");
        Ok(Self { conn })
    }
}

#[async_trait]
impl EscalationLedger for SqliteLedger {
    async fn record(&self, entry: &EscalationEntry) -> Result<(), TillerError> {
        let work_id = entry.work_id.clone();
        let model = entry.model.clone();
        let category = entry.category.to_string();
        let session_key = entry.session_key.clone();
        let created_at = entry.created_at.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO escalations \
                     (work_id, model, category, session_key, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![work_id, model, category, session_key, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(
            work_id = %entry.work_id,
            model = %entry.model,
            session_key = %entry.session_key,
            "escalation recorded"
        );
        Ok(())
    }

    async fn get(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        let work_id = work_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT work_id, model, category, session_key, created_at \
                     FROM escalations WHERE work_id = ?1",
                )?;
                let mut rows = stmt.query_map(rusqlite::params![work_id], row_to_entry)?;
                rows.next().transpose()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        let id = work_id.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let existing = {
                    let mut stmt = tx.prepare(
                        "SELECT work_id, model, category, session_key, created_at \
                         FROM escalations WHERE work_id = ?1",
                    )?;
                    let mut rows = stmt.query_map(rusqlite::params![id], row_to_entry)?;
                    rows.next().transpose()?
                };
                if existing.is_some() {
                    tx.execute(
                        "DELETE FROM escalations WHERE work_id = ?1",
                        rusqlite::params![id],
                    )?;
                }
                tx.commit()?;
                Ok(existing)
            })
            .await
            .map_err(map_tr_err)?;

        if removed.is_some() {
            debug!(work_id, "escalation removed");
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<EscalationEntry>, TillerError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT work_id, model, category, session_key, created_at \
                     FROM escalations ORDER BY work_id",
                )?;
                let rows = stmt.query_map([], row_to_entry)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }
}
