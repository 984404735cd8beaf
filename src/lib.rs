//! # Casepack
//!
//! Incremental support-case ingestion with durable batching and
//! checkpointed resumption.
//!
//! Casepack paginates a cloud support API's case listing, joins each case's
//! communications into one text record, groups records into fixed-size
//! batches, writes every batch as a single artifact file, and checkpoints
//! the last committed case id — so a scheduled re-run resumes exactly where
//! the previous one stopped, without reprocessing or dropping cases, even
//! under partial failure. The artifacts feed an external retrieval+
//! generation knowledge base that Casepack can also query.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Support API  │──▶│ Orchestrator │──▶│ Case store   │
//! │ cases + msgs │   │ batch of N   │   │ one file per │
//! └──────────────┘   └──────┬───────┘   │ batch        │
//!                           │           └─────────────┘
//!                           ▼
//!                    ┌──────────────┐
//!                    │  Checkpoint  │
//!                    │  (SQLite)    │
//!                    └──────────────┘
//! ```
//!
//! The write order is fixed: batch first, checkpoint second. A run that
//! dies in between leaves the checkpoint behind the written data, which is
//! safe — the next run re-lists from the checkpoint and skips anything at
//! or before it.
//!
//! ## Quick Start
//!
//! ```bash
//! casepack init                  # create checkpoint db + case store dir
//! casepack sync                  # ingest new cases since the checkpoint
//! casepack status                # show checkpoint and artifact counts
//! casepack query "login errors"  # ask the downstream knowledge base
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing with env overrides |
//! | [`models`] | Core data types and case-id helpers |
//! | [`support_api`] | Paginated case-listing and communication client |
//! | [`checkpoint`] | Durable last-committed-case record |
//! | [`store`] | All-or-nothing batch artifact writer |
//! | [`ingest`] | Ingestion orchestration and run classification |
//! | [`query`] | Downstream query-service client |
//! | [`status`] | Checkpoint and store health report |

pub mod checkpoint;
pub mod config;
pub mod ingest;
pub mod models;
pub mod query;
pub mod status;
pub mod store;
pub mod support_api;
