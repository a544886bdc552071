// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shutdown signal handling for `tiller serve`.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received. If a handler cannot be installed the failure is logged and the
/// server runs until its input closes.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, shutting down"),
                        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, shutting down"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, shutting down"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}
