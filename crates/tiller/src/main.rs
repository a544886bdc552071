// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiller - session-scoped model routing for agent runtimes.
//!
//! This is the binary entry point: the NDJSON hook server plus a few
//! inspection commands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tiller_config::TillerConfig;
use tiller_core::TillerError;
use tiller_router::{ClassificationSource, Classifier};
use tiller_semantic::HttpSemanticClassifier;

/// Tiller - session-scoped model routing for agent runtimes.
#[derive(Parser, Debug)]
#[command(name = "tiller", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard lookup.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve hook events as newline-delimited JSON on stdin/stdout.
    Serve,
    /// Classify a piece of text and show the models it would route to.
    Classify {
        /// Text to classify.
        text: String,
    },
    /// Inspect or edit the escalation ledger.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// Inspect the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum LedgerAction {
    /// List open escalations.
    List,
    /// Remove the escalation for a unit of work.
    Remove {
        /// Work id to remove.
        work_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate the configuration and print the effective values as TOML.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tiller_config::load_and_validate_path(path),
        None => tiller_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tiller_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Classify { text }) => run_classify(&config, &text).await,
        Some(Commands::Ledger { action }) => run_ledger(&config, action).await,
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => run_config_check(&config),
        None => {
            println!("tiller: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("tiller: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout belongs to the hook protocol.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tiller={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn run_classify(config: &TillerConfig, text: &str) -> Result<(), TillerError> {
    let mut classifier = Classifier::new(&config.routing);
    if config.semantic.enabled {
        let semantic = HttpSemanticClassifier::new(&config.semantic)?;
        classifier = classifier.with_semantic(Arc::new(semantic), &config.semantic);
    }

    let result = classifier.classify_turn(text).await;
    let source = match &result.source {
        ClassificationSource::Signal(signal) => format!("signal:{signal}"),
        ClassificationSource::Semantic => "semantic".to_string(),
        ClassificationSource::Default => "default".to_string(),
    };
    let models = config
        .routing
        .models_for(result.category.as_str())
        .unwrap_or_default();

    let report = serde_json::json!({
        "category": result.category.as_str(),
        "source": source,
        "models": models,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_ledger(config: &TillerConfig, action: LedgerAction) -> Result<(), TillerError> {
    let ledger = tiller_ledger::open_ledger(&config.ledger).await?;
    match action {
        LedgerAction::List => {
            let entries = ledger.list().await?;
            if entries.is_empty() {
                println!("no open escalations");
            }
            for entry in entries {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.work_id, entry.model, entry.category, entry.session_key, entry.created_at
                );
            }
        }
        LedgerAction::Remove { work_id } => match ledger.remove(&work_id).await? {
            Some(entry) => println!("removed {} ({})", entry.work_id, entry.model),
            None => println!("no escalation for {work_id}"),
        },
    }
    Ok(())
}

fn run_config_check(config: &TillerConfig) -> Result<(), TillerError> {
    let mut shown = config.clone();
    if shown.semantic.api_key.is_some() {
        shown.semantic.api_key = Some("<redacted>".to_string());
    }
    let rendered = toml::to_string_pretty(&shown)
        .map_err(|e| TillerError::Internal(format!("failed to render configuration: {e}")))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_nested_subcommands() {
        let cli = Cli::try_parse_from(["tiller", "--config", "t.toml", "ledger", "remove", "W1"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("t.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Ledger {
                action: LedgerAction::Remove { ref work_id }
            }) if work_id == "W1"
        ));
    }

    #[test]
    fn default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&TillerConfig::default()).unwrap();
        let reparsed = tiller_config::load_config_from_str(&rendered).unwrap();
        assert_eq!(reparsed.routing.default_model, "gemini-flash");
        assert_eq!(reparsed.routing.categories.len(), 4);
    }
}
