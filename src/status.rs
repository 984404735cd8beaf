//! Ingestion status overview.
//!
//! Quick summary of where the pipeline stands: the current checkpoint, when
//! it last advanced, and how many artifacts the case store holds. Used by
//! `casepack status` to verify a scheduled sync is making progress.

use anyhow::Result;
use chrono::DateTime;

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::models;
use crate::store::CaseStore;

pub async fn run_status(config: &Config) -> Result<()> {
    let checkpoint = CheckpointStore::open(&config.checkpoint.db_path).await?;
    let last_case = checkpoint.get().await?;
    let last_sync = checkpoint.last_updated().await?;

    let store = CaseStore::new(&config.case_store.dir)?;
    let artifact_count = store.artifact_count()?;

    println!("Casepack — Ingestion Status");
    println!("===========================");
    println!();
    println!("  Checkpoint db:  {}", config.checkpoint.db_path.display());
    match &last_case {
        Some(case_id) => {
            println!("  Last case:      {}", case_id);
            if let Some(created) = models::case_created_at(case_id) {
                println!("  Case created:   {}", created.format("%Y-%m-%d %H:%M"));
            }
        }
        None => println!("  Last case:      none (first run pending)"),
    }
    match last_sync {
        Some(ts) => println!("  Last sync:      {}", format_ts(ts)),
        None => println!("  Last sync:      never"),
    }
    println!();
    println!("  Case store:     {}", config.case_store.dir.display());
    println!("  Artifacts:      {}", artifact_count);
    println!();

    checkpoint.close().await;
    Ok(())
}

fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
