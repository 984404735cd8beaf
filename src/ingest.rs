//! Ingestion pipeline orchestration.
//!
//! Coordinates one incremental run: read checkpoint → stream cases →
//! fetch communication text → accumulate fixed-size batches → write each
//! full batch → advance checkpoint → flush the final partial batch.
//!
//! The run is strictly sequential because checkpoint correctness depends on
//! ordering: a case id is never checkpointed before its text is durably
//! stored. Within one run there are no retries; re-invocation on the next
//! scheduled trigger retries from the last checkpoint, so the guaranteed
//! property is at-least-once delivery per case.

use thiserror::Error;

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::models::{Batch, RunOutcome};
use crate::store::CaseStore;
use crate::support_api::{CaseSource, SupportClient};

/// Terminal failure of an ingestion run, classified for the triggering
/// caller. Every variant aborts the run; the checkpoint always reflects the
/// last durably written batch.
#[derive(Debug, Error)]
pub enum RunError {
    /// Upstream case-listing or pagination failure. The checkpoint is
    /// preserved; batches written earlier in the run remain durable.
    #[error("case source failure: {0:#}")]
    Source(anyhow::Error),
    /// Artifact write failure. The in-memory batch is discarded and the
    /// checkpoint is unchanged, so the next run retries the same cases.
    #[error("artifact storage failure: {0:#}")]
    Storage(anyhow::Error),
    /// Checkpoint store failure. When this follows a successful write it
    /// leaves a detectable inconsistency for the operator to reconcile;
    /// erroring out beats silently corrupting resumption.
    #[error("checkpoint failure: {0:#}")]
    Checkpoint(anyhow::Error),
}

impl RunError {
    /// Stable classification string for machine-readable run results.
    pub fn classification(&self) -> &'static str {
        match self {
            RunError::Source(_) => "source",
            RunError::Storage(_) => "storage",
            RunError::Checkpoint(_) => "checkpoint",
        }
    }

    /// Machine-readable shape for the triggering scheduler.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.classification(),
            "detail": self.to_string(),
        })
    }
}

/// Run one ingestion pass against the live support API.
///
/// `full` ignores the stored checkpoint and re-lists from the beginning;
/// `batch_size` overrides the configured cases-per-artifact count.
pub async fn run_sync(
    config: &Config,
    full: bool,
    batch_size: Option<usize>,
) -> Result<RunOutcome, RunError> {
    let checkpoint = CheckpointStore::open(&config.checkpoint.db_path)
        .await
        .map_err(RunError::Checkpoint)?;
    let store = CaseStore::new(&config.case_store.dir).map_err(RunError::Storage)?;
    let client = SupportClient::new(&config.support_api).map_err(RunError::Source)?;

    let after = if full {
        None
    } else {
        checkpoint.get().await.map_err(RunError::Checkpoint)?
    };

    let mut source = client.list_cases(after.as_deref());
    let n = batch_size.unwrap_or(config.ingest.batch_size);

    let outcome = ingest_stream(&mut source, &store, &checkpoint, n).await;
    checkpoint.close().await;
    outcome
}

/// Core of the orchestrator, generic over the case source so tests can
/// drive it with scripted streams.
///
/// Each invocation owns a fresh accumulator batch; nothing is carried
/// across runs except the checkpoint.
pub async fn ingest_stream<S: CaseSource>(
    source: &mut S,
    store: &CaseStore,
    checkpoint: &CheckpointStore,
    batch_size: usize,
) -> Result<RunOutcome, RunError> {
    let mut batch = Batch::new(batch_size);
    let mut artifacts = Vec::new();

    while let Some(case) = source.next_case().await.map_err(RunError::Source)? {
        let text = source.fetch_text(&case.case_id).await;
        if text.is_empty() {
            // Valid, skippable outcome; the surrounding cases still flow.
            eprintln!(
                "Warning: case {} ('{}') has no communications; skipping",
                case.case_id, case.subject
            );
            continue;
        }

        batch.push(case.case_id, text);
        if batch.is_full() {
            flush(&mut batch, store, checkpoint, &mut artifacts).await?;
        }
    }

    // Drain the final partial batch so no case is left un-checkpointed when
    // the stream length is not a multiple of the batch size.
    if !batch.is_empty() {
        flush(&mut batch, store, checkpoint, &mut artifacts).await?;
    }

    if artifacts.is_empty() {
        Ok(RunOutcome::NoNewCases)
    } else {
        Ok(RunOutcome::Artifacts(artifacts))
    }
}

/// Write the accumulated batch, then advance the checkpoint to its last
/// case id, then reset the accumulator. Ordering is load-bearing: the
/// checkpoint must never move past data that is not yet durable.
async fn flush(
    batch: &mut Batch,
    store: &CaseStore,
    checkpoint: &CheckpointStore,
    artifacts: &mut Vec<String>,
) -> Result<(), RunError> {
    let Some(last_case_id) = batch.last_case_id().map(str::to_string) else {
        return Ok(());
    };

    let name = store.write_batch(batch).map_err(RunError::Storage)?;
    checkpoint
        .set(&last_case_id)
        .await
        .map_err(RunError::Checkpoint)?;

    artifacts.push(name);
    batch.clear();
    Ok(())
}
