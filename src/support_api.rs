//! Upstream support API client.
//!
//! Wraps the cloud support system's paginated case-listing and
//! communication endpoints behind two contracts:
//!
//! - [`SupportClient::list_cases`] — a lazy, finite, forward-only
//!   [`CaseStream`] that follows `nextToken` continuation until the listing
//!   is exhausted. A stream is never restarted mid-flight; a fresh run
//!   builds a fresh stream from the checkpoint.
//! - [`SupportClient::fetch_case_text`] — concatenates every communication
//!   body of one case into a single ordered text block. Failures here are
//!   isolated: they log a warning and yield an empty string so one broken
//!   case cannot halt the run.
//!
//! # Endpoints
//!
//! ```text
//! GET {base_url}/v1/cases?afterTime=<rfc3339>&nextToken=<token>
//! GET {base_url}/v1/cases/{caseId}/communications?nextToken=<token>
//! ```
//!
//! # Authentication
//!
//! A bearer token is read from the `SUPPORT_API_TOKEN` environment variable
//! when present; requests go out unauthenticated otherwise (useful against
//! local test doubles).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;

use crate::config::SupportApiConfig;
use crate::models::{case_created_at, Case, Communication};

/// Environment variable holding the optional bearer token.
pub const TOKEN_VAR: &str = "SUPPORT_API_TOKEN";

/// A pull-based source of cases. The ingestion orchestrator is generic over
/// this seam so tests can substitute scripted sources for the live API.
#[async_trait]
pub trait CaseSource {
    /// The next case after the configured cursor, or `None` once the
    /// listing is exhausted. A page-fetch failure aborts the stream;
    /// already-yielded cases are unaffected.
    async fn next_case(&mut self) -> Result<Option<Case>>;

    /// All communication text for one case, joined with blank lines in API
    /// return order. Infallible by contract: zero communications and
    /// upstream errors both yield an empty string (errors are logged).
    async fn fetch_text(&mut self, case_id: &str) -> String;
}

/// HTTP client for the support API. Cheap to clone; each [`CaseStream`]
/// carries its own copy.
#[derive(Debug, Clone)]
pub struct SupportClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCasesResponse {
    #[serde(default)]
    cases: Vec<Case>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCommunicationsResponse {
    #[serde(default)]
    communications: Vec<Communication>,
    #[serde(default)]
    next_token: Option<String>,
}

impl SupportClient {
    pub fn new(config: &SupportApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: std::env::var(TOKEN_VAR).ok(),
        })
    }

    /// Open a lazy case stream starting after `after_case_id`.
    ///
    /// When the cursor id carries a parseable timestamp it is passed to the
    /// API as an inclusive `afterTime` lower bound; the stream still skips
    /// every case at or before the cursor itself, since the API's time
    /// granularity is coarser than id order. An unparseable cursor logs a
    /// warning and lists without a time filter (fail-open).
    pub fn list_cases(&self, after_case_id: Option<&str>) -> CaseStream {
        let after_time = after_case_id.and_then(|id| match case_created_at(id) {
            Some(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => {
                eprintln!(
                    "Warning: checkpoint case id '{}' has no parseable timestamp; listing without a time filter",
                    id
                );
                None
            }
        });

        CaseStream {
            client: self.clone(),
            after_case_id: after_case_id.map(str::to_string),
            after_time,
            buffered: VecDeque::new(),
            next_token: None,
            exhausted: false,
        }
    }

    async fn list_page(
        &self,
        after_time: Option<&str>,
        next_token: Option<&str>,
    ) -> Result<ListCasesResponse> {
        let url = format!("{}/v1/cases", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(ts) = after_time {
            request = request.query(&[("afterTime", ts)]);
        }
        if let Some(token) = next_token {
            request = request.query(&[("nextToken", token)]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Case listing request failed: {}", url))?
            .error_for_status()
            .context("Case listing returned an error status")?;

        response
            .json()
            .await
            .context("Malformed case listing response")
    }

    /// Concatenated communication text for one case.
    ///
    /// Returns an empty string both for a case with zero communications (a
    /// valid, skippable outcome) and on upstream failure (logged); neither
    /// aborts the surrounding run.
    pub async fn fetch_case_text(&self, case_id: &str) -> String {
        match self.fetch_communications(case_id).await {
            Ok(bodies) => bodies.join("\n\n"),
            Err(e) => {
                eprintln!(
                    "Warning: failed to fetch communications for {}: {:#}",
                    case_id, e
                );
                String::new()
            }
        }
    }

    async fn fetch_communications(&self, case_id: &str) -> Result<Vec<String>> {
        let url = format!("{}/v1/cases/{}/communications", self.base_url, case_id);
        let mut bodies = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url);
            if let Some(token) = &next_token {
                request = request.query(&[("nextToken", token)]);
            }
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Communications request failed: {}", url))?
                .error_for_status()
                .context("Communications listing returned an error status")?;

            let page: ListCommunicationsResponse = response
                .json()
                .await
                .context("Malformed communications response")?;

            bodies.extend(page.communications.into_iter().map(|c| c.body));

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(bodies)
    }
}

/// Lazy sequence of cases, one upstream page in flight at a time.
///
/// Finite and forward-only: once a page fetch fails or the listing is
/// exhausted the stream yields nothing further. Continuation tokens are
/// threaded internally and never survive the stream.
pub struct CaseStream {
    client: SupportClient,
    after_case_id: Option<String>,
    after_time: Option<String>,
    buffered: VecDeque<Case>,
    next_token: Option<String>,
    exhausted: bool,
}

#[async_trait]
impl CaseSource for CaseStream {
    async fn next_case(&mut self) -> Result<Option<Case>> {
        loop {
            if let Some(case) = self.buffered.pop_front() {
                // Client-side skip: the afterTime filter is inclusive and
                // coarse, so the page can still contain the checkpointed
                // case and its contemporaries.
                if let Some(after) = &self.after_case_id {
                    if case.case_id.as_str() <= after.as_str() {
                        continue;
                    }
                }
                return Ok(Some(case));
            }

            if self.exhausted {
                return Ok(None);
            }

            let page = self
                .client
                .list_page(self.after_time.as_deref(), self.next_token.as_deref())
                .await?;

            self.next_token = page.next_token;
            if self.next_token.is_none() {
                self.exhausted = true;
            }
            self.buffered.extend(page.cases);

            if self.buffered.is_empty() && self.exhausted {
                return Ok(None);
            }
        }
    }

    async fn fetch_text(&mut self, case_id: &str) -> String {
        self.client.fetch_case_text(case_id).await
    }
}
