// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the tiller model router.

use thiserror::Error;

/// The primary error type used across tiller collaborators and core operations.
///
/// Nothing in the routing core is fatal: callers log these and degrade to
/// "stay on the current model" rather than aborting a turn.
#[derive(Debug, Error)]
pub enum TillerError {
    /// Configuration errors (invalid values, missing required settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Escalation ledger errors (unreadable file, malformed document, database failure).
    #[error("ledger error: {message}")]
    Ledger {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Semantic classifier errors (HTTP failure, unexpected response shape).
    #[error("classifier error: {message}")]
    Classifier {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// External work tracker errors (command missing, non-zero exit, unparsable output).
    #[error("work tracker error: {message}")]
    Tracker {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An external call did not finish in time.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TillerError {
    /// Builds a [`TillerError::Ledger`] wrapping an underlying error.
    pub fn ledger<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TillerError::Ledger {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds a [`TillerError::Tracker`] wrapping an underlying error.
    pub fn tracker<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TillerError::Tracker {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
