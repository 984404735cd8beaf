//! # Casepack CLI
//!
//! The `casepack` binary drives the ingestion pipeline and its supporting
//! commands. It is designed to be invoked by a periodic scheduler (nominally
//! weekly); the scheduler must guarantee at-most-one concurrent invocation,
//! since two runs against the same checkpoint would race.
//!
//! ## Usage
//!
//! ```bash
//! casepack --config ./config/casepack.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `casepack init` | Create the checkpoint database and case-store directory |
//! | `casepack sync` | Ingest cases created since the last checkpoint |
//! | `casepack status` | Show the checkpoint and artifact counts |
//! | `casepack query "<text>"` | Ask the downstream knowledge base |
//!
//! ## Examples
//!
//! ```bash
//! # First run: everything the API will list
//! casepack sync --config ./config/casepack.toml
//!
//! # Scheduler-friendly machine output
//! casepack sync --json
//!
//! # Re-ingest from scratch, ignoring the checkpoint
//! casepack sync --full
//!
//! # Ask the knowledge base built from the artifacts
//! casepack query "recurring login failures in March"
//! ```

mod checkpoint;
mod config;
mod ingest;
mod models;
mod query;
mod status;
mod store;
mod support_api;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::RunOutcome;

/// Casepack — incremental support-case ingestion with durable batching and
/// checkpointed resumption.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with the support API endpoint, case-store directory, checkpoint
/// database path, and batch size.
#[derive(Parser)]
#[command(
    name = "casepack",
    about = "Casepack — incremental support-case ingestion with checkpointed resumption",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/casepack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the checkpoint database and case-store directory.
    ///
    /// Idempotent — running it multiple times is safe. `sync` also creates
    /// both on demand, so `init` mainly serves to verify configuration.
    Init,

    /// Ingest cases created since the last checkpoint.
    ///
    /// Lists new cases from the support API, joins each case's
    /// communications into one record, writes batches of N records as
    /// artifact files, and advances the checkpoint after every durable
    /// batch. A run with nothing to ingest reports "no new cases".
    Sync {
        /// Ignore the checkpoint — re-list all cases from scratch.
        #[arg(long)]
        full: bool,

        /// Override the configured cases-per-artifact batch size.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Emit the run result as a single JSON object on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Show the current checkpoint and case-store contents.
    Status,

    /// Ask the downstream knowledge base a free-text question.
    ///
    /// Prints the generated summary and the case ids used as evidence.
    /// Requires a `[query]` endpoint in the configuration.
    Query {
        /// The question to ask.
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let checkpoint = checkpoint::CheckpointStore::open(&cfg.checkpoint.db_path).await?;
            checkpoint.close().await;
            store::CaseStore::new(&cfg.case_store.dir)?;
            println!("Checkpoint database and case store initialized.");
        }
        Commands::Sync {
            full,
            batch_size,
            json,
        } => {
            let batch_size = config::effective_batch_size(&cfg, batch_size)?;
            match ingest::run_sync(&cfg, full, Some(batch_size)).await {
                Ok(outcome) => {
                    if json {
                        println!("{}", outcome.to_json());
                    } else {
                        print_outcome(&outcome);
                    }
                }
                Err(e) => {
                    if json {
                        println!("{}", e.to_json());
                        std::process::exit(1);
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Query { text } => {
            query::run_query(&cfg, &text).await?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    println!("sync support-api");
    match outcome {
        RunOutcome::Artifacts(names) => {
            println!("  artifacts written: {}", names.len());
            for name in names {
                println!("    {}", name);
            }
        }
        RunOutcome::NoNewCases => {
            println!("  no new cases");
        }
    }
    println!("ok");
}
