// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborators for deterministic router tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tiller_core::{
    Category, EscalationEntry, EscalationLedger, SemanticClassifier, TillerError, WorkTracker,
};
use tokio::sync::Mutex;

/// A semantic classifier that returns pre-configured labels.
///
/// Labels are popped from a FIFO queue. When the queue is empty, `simple`
/// is returned. `None` entries simulate an unavailable service.
#[derive(Default)]
pub struct MockSemantic {
    labels: Arc<Mutex<VecDeque<Option<String>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockSemantic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock pre-loaded with the given labels.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: Arc::new(Mutex::new(
                labels.into_iter().map(|l| Some(l.into())).collect(),
            )),
            calls: Arc::default(),
        }
    }

    /// Queue a failure for the next call.
    pub async fn push_failure(&self) {
        self.labels.lock().await.push_back(None);
    }

    /// Texts the mock was asked to classify, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl SemanticClassifier for MockSemantic {
    async fn classify(&self, text: &str, _categories: &[Category]) -> Result<String, TillerError> {
        self.calls.lock().await.push(text.to_string());
        match self.labels.lock().await.pop_front() {
            Some(Some(label)) => Ok(label),
            Some(None) => Err(TillerError::Classifier {
                message: "mock classifier unavailable".to_string(),
                source: None,
            }),
            None => Ok(tiller_core::SIMPLE_CATEGORY.to_string()),
        }
    }
}

/// A work tracker that hands out `W1`, `W2`, ... and remembers titles.
#[derive(Default)]
pub struct MockTracker {
    opened: Mutex<Vec<String>>,
    fail: bool,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker whose every `open` fails.
    pub fn failing() -> Self {
        Self {
            opened: Mutex::default(),
            fail: true,
        }
    }

    /// Titles of units of work opened so far.
    pub async fn opened(&self) -> Vec<String> {
        self.opened.lock().await.clone()
    }
}

#[async_trait]
impl WorkTracker for MockTracker {
    async fn open(&self, title: &str) -> Result<String, TillerError> {
        if self.fail {
            return Err(TillerError::Tracker {
                message: "mock tracker refused".to_string(),
                source: None,
            });
        }
        let mut opened = self.opened.lock().await;
        opened.push(title.to_string());
        Ok(format!("W{}", opened.len()))
    }
}

/// A ledger whose every operation fails, for degradation tests.
#[derive(Debug, Default)]
pub struct FailingLedger;

fn unavailable() -> TillerError {
    TillerError::Ledger {
        message: "ledger unavailable".to_string(),
        source: None,
    }
}

#[async_trait]
impl EscalationLedger for FailingLedger {
    async fn record(&self, _entry: &EscalationEntry) -> Result<(), TillerError> {
        Err(unavailable())
    }

    async fn get(&self, _work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        Err(unavailable())
    }

    async fn remove(&self, _work_id: &str) -> Result<Option<EscalationEntry>, TillerError> {
        Err(unavailable())
    }

    async fn list(&self) -> Result<Vec<EscalationEntry>, TillerError> {
        Err(unavailable())
    }
}
