//! Client for the downstream retrieval+generation query service.
//!
//! The knowledge base that indexes written artifacts is an external
//! collaborator: this module only submits a free-text question and prints
//! the generated summary plus the case ids used as evidence.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// Response shape of the query service: a generated summary plus the case
/// ids used as evidence, as `{"summary": ..., "case_ids": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryAnswer {
    pub summary: String,
    #[serde(default)]
    pub case_ids: Vec<String>,
}

/// Submit a free-text query and return the generated answer.
pub async fn ask(config: &Config, query: &str) -> Result<QueryAnswer> {
    let Some(query_config) = &config.query else {
        bail!("No [query] endpoint configured; add one to the config file");
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(query_config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let url = format!("{}/v1/query", query_config.endpoint.trim_end_matches('/'));
    let response = client
        .post(&url)
        .json(&QueryRequest { query })
        .send()
        .await
        .with_context(|| format!("Query request failed: {}", url))?
        .error_for_status()
        .context("Query service returned an error status")?;

    response.json().await.context("Malformed query response")
}

/// Run the query command: ask the service and print the answer.
pub async fn run_query(config: &Config, query: &str) -> Result<()> {
    let answer = ask(config, query).await?;

    println!("{}", answer.summary);
    if !answer.case_ids.is_empty() {
        println!();
        println!("Evidence cases:");
        for case_id in &answer.case_ids {
            println!("  {}", case_id);
        }
    }
    Ok(())
}
