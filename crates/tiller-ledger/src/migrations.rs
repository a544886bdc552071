// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded SQLite migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!` and run whenever a SQLite ledger is opened.

use tiller_core::TillerError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), TillerError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| TillerError::ledger("ledger migration failed", e))?;
    Ok(())
}
