// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tiller serve` command implementation.
//!
//! Reads hook events as newline-delimited JSON on stdin and writes one
//! response line per event on stdout. Each session gets its own worker task
//! so events of one session are handled strictly in order while different
//! sessions proceed concurrently. Logs go to stderr.

use std::collections::HashMap;
use std::sync::Arc;

use tiller_config::TillerConfig;
use tiller_core::TillerError;
use tiller_hooks::{HookEvent, HookRequest, HookResponse, RouterHooks, ShellWorkTracker};
use tiller_ledger::open_ledger;
use tiller_router::{SessionRouter, SessionStore};
use tiller_semantic::HttpSemanticClassifier;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::shutdown;

/// Events buffered per session before the reader waits.
const SESSION_QUEUE: usize = 64;

/// Responses buffered before workers wait on the writer.
const OUTPUT_QUEUE: usize = 256;

/// Runs the `tiller serve` command until stdin closes or a signal arrives.
pub async fn run_serve(config: TillerConfig) -> Result<(), TillerError> {
    let router = build_router(&config).await?;
    let hooks = RouterHooks::new(Arc::new(router), &config);
    let cancel = shutdown::install_signal_handler();

    info!(
        default_model = config.routing.default_model.as_str(),
        categories = config.routing.categories.len(),
        ledger = %config.ledger.backend,
        "tiller serving hook events on stdin"
    );

    let stdin = BufReader::new(tokio::io::stdin());
    serve_lines(hooks, stdin, tokio::io::stdout(), cancel.clone()).await?;
    cancel.cancel();
    info!("tiller stopped");
    Ok(())
}

/// Wires a router to the configured ledger, classifier, and tracker.
pub async fn build_router(config: &TillerConfig) -> Result<SessionRouter, TillerError> {
    let ledger = open_ledger(&config.ledger).await?;
    let mut router = SessionRouter::new(config.clone(), SessionStore::new(), ledger)?;

    if config.semantic.enabled {
        let semantic = HttpSemanticClassifier::new(&config.semantic)?;
        router = router.with_semantic(Arc::new(semantic));
        debug!(model = config.semantic.model.as_str(), "semantic classifier enabled");
    }
    if config.tracking.open_on_approval {
        router = router.with_tracker(Arc::new(ShellWorkTracker::new(&config.tracking)));
        debug!(program = config.tracking.program.as_str(), "work tracker enabled");
    }
    Ok(router)
}

struct Worker {
    tx: mpsc::Sender<HookRequest>,
    handle: JoinHandle<()>,
}

/// Serves NDJSON hook events from `reader` to `writer`.
///
/// Returns the writer once every queued event has been answered.
pub async fn serve_lines<R, W>(
    hooks: RouterHooks,
    reader: R,
    writer: W,
    cancel: CancellationToken,
) -> Result<W, TillerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::channel::<HookResponse>(OUTPUT_QUEUE);
    let writer_task = tokio::spawn(write_responses(writer, out_rx));

    let mut workers: HashMap<String, Worker> = HashMap::new();
    // Workers of ended sessions, awaited before a reused key starts again.
    let mut retired: HashMap<String, JoinHandle<()>> = HashMap::new();
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                info!("shutdown requested, draining sessions");
                break;
            }
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("input closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "failed to read hook input");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request = match HookRequest::parse(&line) {
            Ok(request) => request,
            Err((id, e)) => {
                warn!(error = %e, "malformed hook event");
                let _ = out_tx.send(HookResponse::error(id, e.to_string())).await;
                continue;
            }
        };

        let key = request.event.session_key().to_string();
        let ends_session = matches!(request.event, HookEvent::SessionEnd { .. });
        let worker = workers.entry(key.clone()).or_insert_with(|| {
            let previous = retired.remove(&key);
            spawn_worker(hooks.clone(), key.clone(), previous, out_tx.clone())
        });
        if worker.tx.send(request).await.is_err() {
            warn!(session_key = key.as_str(), "session worker stopped, event dropped");
        }

        if ends_session && let Some(worker) = workers.remove(&key) {
            retired.retain(|_, handle| !handle.is_finished());
            retired.insert(key, worker.handle);
        }
    }

    let handles: Vec<JoinHandle<()>> = workers
        .into_values()
        .map(|w| w.handle)
        .chain(retired.into_values())
        .collect();
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "session worker failed");
        }
    }
    drop(out_tx);

    writer_task
        .await
        .map_err(|e| TillerError::Internal(format!("response writer failed: {e}")))?
        .map_err(|e| TillerError::Internal(format!("failed to write response: {e}")))
}

fn spawn_worker(
    hooks: RouterHooks,
    session_key: String,
    previous: Option<JoinHandle<()>>,
    out: mpsc::Sender<HookResponse>,
) -> Worker {
    let (tx, mut rx) = mpsc::channel::<HookRequest>(SESSION_QUEUE);
    let handle = tokio::spawn(async move {
        if let Some(previous) = previous {
            let _ = previous.await;
        }
        debug!(session_key = session_key.as_str(), "session worker started");
        while let Some(request) = rx.recv().await {
            let directive = hooks.handle(&request.event).await;
            if out
                .send(HookResponse::directive(request.id, directive))
                .await
                .is_err()
            {
                warn!(session_key = session_key.as_str(), "response writer gone");
                break;
            }
        }
        debug!(session_key = session_key.as_str(), "session worker stopped");
    });
    Worker { tx, handle }
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<HookResponse>,
) -> Result<W, std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(writer)
}
