// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation ledger stored as a single JSON document.
//!
//! The document is an object keyed by work id:
//!
//! ```json
//! { "W1": { "model": "opus", "category": "coding", "session_key": "s1", "created_at": "..." } }
//! ```
//!
//! Every call holds an exclusive lock on a sidecar `<name>.lock` file for
//! the whole read-modify-write, so separate handles and separate processes
//! sharing one ledger never lose each other's entries. Writes go to a
//! uniquely named temp file in the same directory which then replaces the
//! document atomically.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tiller_core::{Category, EscalationEntry, EscalationLedger, TillerError};
use tokio::sync::Mutex;
use tracing::debug;

/// On-disk shape of one entry; the work id is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    model: String,
    category: Category,
    session_key: String,
    created_at: String,
}

type Document = BTreeMap<String, StoredEntry>;

fn into_entry(work_id: String, stored: StoredEntry) -> EscalationEntry {
    EscalationEntry {
        work_id,
        model: stored.model,
        category: stored.category,
        session_key: stored.session_key,
        created_at: stored.created_at,
    }
}

/// JSON-document escalation ledger.
pub struct JsonFileLedger {
    path: PathBuf,
    /// Serializes this handle's calls so they queue here instead of on the
    /// blocking pool.
    lock: Mutex<()>,
}

impl JsonFileLedger {
    /// Creates a ledger at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` on the blocking pool while holding the file lock.
    async fn locked<T, F>(&self, f: F) -> Result<T, TillerError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, TillerError> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = lock_file(&path)?;
            f(&path)
        })
        .await
        .map_err(|e| TillerError::Internal(format!("ledger task failed: {e}")))?
    }
}

/// Opens `<name>.lock` next to the ledger and locks it exclusively.
///
/// The lock is released when the returned file is dropped.
fn lock_file(path: &Path) -> Result<File, TillerError> {
    if let Some(parent) = parent_dir(path) {
        std::fs::create_dir_all(parent)
            .map_err(|e| TillerError::ledger(format!("cannot create {}", parent.display()), e))?;
    }
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "escalations.json".into());
    name.push(".lock");
    let lock_path = path.with_file_name(name);

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| TillerError::ledger(format!("cannot open {}", lock_path.display()), e))?;
    FileExt::lock_exclusive(&file)
        .map_err(|e| TillerError::ledger(format!("cannot lock {}", lock_path.display()), e))?;
    Ok(file)
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Reads the document. A missing or blank file is an empty ledger.
fn load(path: &Path) -> Result<Document, TillerError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
        Err(e) => {
            return Err(TillerError::ledger(
                format!("cannot read {}", path.display()),
                e,
            ));
        }
    };
    if raw.trim().is_empty() {
        return Ok(Document::new());
    }
    serde_json::from_str(&raw)
        .map_err(|e| TillerError::ledger(format!("malformed ledger {}", path.display()), e))
}

fn store(path: &Path, doc: &Document) -> Result<(), TillerError> {
    let dir = parent_dir(path).unwrap_or(Path::new("."));
    let body = serde_json::to_string_pretty(doc)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        TillerError::ledger(format!("cannot create temp file in {}", dir.display()), e)
    })?;
    tmp.write_all(body.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| TillerError::ledger(format!("cannot write {}", tmp.path().display()), e))?;
    tmp.persist(path).map_err(|e| {
        TillerError::ledger(format!("cannot replace {}", path.display()), e.error)
    })?;
    Ok(())
}

#[async_trait]
impl EscalationLedger for JsonFileLedger {
    async fn record(&self, entry: &EscalationEntry) -> Result<(), TillerError> {
        let work_id = entry.work_id.clone();
        let stored = StoredEntry {
            model: entry.model.clone(),
            category: entry.category.clone(),
            session_key: entry.session_key.clone(),
            created_at: entry.created_at.clone(),
        };
        let replaced = self
            .locked(move |path| {
                let mut doc = load(path)?;
                let replaced = doc.insert(work_id, stored).is_some();
                store(path, &doc)?;
                Ok(replaced)
            })
            .await?;
        debug!(work_id = entry.work_id.as_str(), replaced, "escalation recorded");
        Ok(())
    }

    async fn get(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        let work_id = work_id.to_string();
        self.locked(move |path| {
            let mut doc = load(path)?;
            Ok(doc.remove(&work_id).map(|stored| into_entry(work_id, stored)))
        })
        .await
    }

    async fn remove(&self, work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        let id = work_id.to_string();
        let removed = self
            .locked(move |path| {
                let mut doc = load(path)?;
                let Some(stored) = doc.remove(&id) else {
                    return Ok(None);
                };
                store(path, &doc)?;
                Ok(Some(into_entry(id, stored)))
            })
            .await?;
        if removed.is_some() {
            debug!(work_id, "escalation removed");
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<EscalationEntry>, TillerError> {
        self.locked(|path| {
            Ok(load(path)?
                .into_iter()
                .map(|(work_id, stored)| into_entry(work_id, stored))
                .collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(work_id: &str, model: &str) -> EscalationEntry {
        EscalationEntry::new(work_id, model, Category::new("coding"), "s1")
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("none.json"));
        assert!(ledger.list().await.unwrap().is_empty());
        assert!(ledger.get("W1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_creates_parent_dirs_and_keys_by_work_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("escalations.json");
        let ledger = JsonFileLedger::new(&path);
        ledger.record(&entry("W1", "opus")).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["W1"]["model"], "opus");
        assert_eq!(doc["W1"]["category"], "coding");

        // Only the document and its lock file remain.
        let mut names: Vec<String> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["escalations.json", "escalations.json.lock"]);
    }

    #[tokio::test]
    async fn duplicate_work_id_supersedes() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("l.json"));
        ledger.record(&entry("W1", "opus")).await.unwrap();
        ledger.record(&entry("W1", "sonnet")).await.unwrap();

        let all = ledger.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].model, "sonnet");
    }

    #[tokio::test]
    async fn remove_returns_entry_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("l.json"));
        ledger.record(&entry("W1", "opus")).await.unwrap();
        ledger.record(&entry("W2", "opus")).await.unwrap();

        let removed = ledger.remove("W1").await.unwrap().unwrap();
        assert_eq!(removed.work_id, "W1");
        assert!(ledger.remove("W1").await.unwrap().is_none());
        assert_eq!(ledger.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let ledger = JsonFileLedger::new(&path);
        assert!(matches!(
            ledger.get("W1").await,
            Err(TillerError::Ledger { .. })
        ));
    }

    #[tokio::test]
    async fn blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.json");
        std::fs::write(&path, "  \n").unwrap();
        assert!(JsonFileLedger::new(&path).list().await.unwrap().is_empty());
    }
}
