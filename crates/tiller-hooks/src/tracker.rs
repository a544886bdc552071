// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Work tracker backed by an external command line program.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tiller_config::model::TrackingConfig;
use tiller_core::{TillerError, WorkTracker};
use tokio::process::Command;
use tracing::debug;

/// Opens work items by running `program create_args...` with `{title}`
/// substituted, and reads the new id from stdout.
#[derive(Debug, Clone)]
pub struct ShellWorkTracker {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ShellWorkTracker {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.create_args.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    fn args_for(&self, title: &str) -> Vec<String> {
        self.args.iter().map(|a| a.replace("{title}", title)).collect()
    }
}

/// The last token of the last non-empty line, so both `--silent` output
/// (`bd-12`) and chatty output (`Created issue: bd-12`) yield the id.
fn parse_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .and_then(|l| l.split_whitespace().last())
        .map(|tok| tok.trim_matches(|c: char| c == '"' || c == '\'' || c == '.'))
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl WorkTracker for ShellWorkTracker {
    async fn open(&self, title: &str) -> Result<String, TillerError> {
        let args = self.args_for(title);
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TillerError::tracker(format!("failed to run {}", self.program), e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| TillerError::Timeout {
                duration: self.timeout,
            })?
            .map_err(|e| TillerError::tracker(format!("{} did not complete", self.program), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TillerError::Tracker {
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
                source: None,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let id = parse_id(&stdout).ok_or_else(|| TillerError::Tracker {
            message: format!("{} printed no work id", self.program),
            source: None,
        })?;
        debug!(program = self.program.as_str(), work_id = id.as_str(), "work item opened");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(program: &str, args: &[&str], timeout_ms: u64) -> ShellWorkTracker {
        ShellWorkTracker::new(&TrackingConfig {
            program: program.to_string(),
            create_args: args.iter().map(|s| s.to_string()).collect(),
            timeout_ms,
            ..TrackingConfig::default()
        })
    }

    #[test]
    fn parses_id_from_last_line() {
        assert_eq!(parse_id("bd-12\n").as_deref(), Some("bd-12"));
        assert_eq!(
            parse_id("warming up\nCreated issue: bd-7\n\n").as_deref(),
            Some("bd-7")
        );
        assert_eq!(parse_id("   \n"), None);
    }

    #[test]
    fn title_is_substituted_into_args() {
        let t = tracker("bd", &["create", "{title}", "--silent"], 1000);
        assert_eq!(
            t.args_for("coding work on sonnet"),
            ["create", "coding work on sonnet", "--silent"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_program_and_reads_id() {
        let t = tracker("sh", &["-c", "echo \"opened: {title}\"; echo W-42"], 5000);
        assert_eq!(t.open("review").await.unwrap(), "W-42");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let t = tracker("sh", &["-c", "echo 'no database' >&2; exit 3"], 5000);
        let err = t.open("x").await.unwrap_err();
        assert!(err.to_string().contains("work tracker error"));
        match err {
            TillerError::Tracker { message, .. } => assert!(message.contains("no database")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_program_times_out() {
        let t = tracker("sh", &["-c", "sleep 5; echo W1"], 50);
        assert!(matches!(t.open("x").await, Err(TillerError::Timeout { .. })));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let t = tracker("tiller-no-such-program", &[], 1000);
        assert!(matches!(t.open("x").await, Err(TillerError::Tracker { .. })));
    }
}
