//! Second-pass reranking through an external scoring endpoint
//!
//! The rerank call is strictly best-effort: any endpoint failure across
//! every configured path variant falls back to the original merged order,
//! truncated to the final budget. A rerank failure can never abort the
//! pipeline.

use anyhow::{anyhow, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::RerankSettings;
use crate::errors::{EngineError, Result};
use crate::recall::source::Candidate;
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// Candidate with an endpoint-assigned relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// The underlying candidate
    pub candidate: Candidate,
    /// Score assigned by the rerank endpoint
    pub rerank_score: f32,
    /// Position in the candidate list submitted to the endpoint
    pub original_index: usize,
}

/// Output of the rerank stage
#[derive(Debug, Clone)]
pub enum RerankOutcome {
    /// Endpoint ordering with attached scores
    Reranked(Vec<RankedCandidate>),
    /// Original merged order, truncated to the final budget
    Passthrough(Vec<Candidate>),
}

impl RerankOutcome {
    pub fn len(&self) -> usize {
        match self {
            RerankOutcome::Reranked(list) => list.len(),
            RerankOutcome::Passthrough(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the external endpoint produced this ordering
    pub fn was_reranked(&self) -> bool {
        matches!(self, RerankOutcome::Reranked(_))
    }

    /// Fragment texts in final order
    pub fn texts(&self) -> Vec<&str> {
        match self {
            RerankOutcome::Reranked(list) => {
                list.iter().map(|r| r.candidate.text.as_str()).collect()
            }
            RerankOutcome::Passthrough(list) => {
                list.iter().map(|c| c.text.as_str()).collect()
            }
        }
    }

    /// Candidates in final order, dropping rerank annotations
    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            RerankOutcome::Reranked(list) => list.into_iter().map(|r| r.candidate).collect(),
            RerankOutcome::Passthrough(list) => list,
        }
    }
}

/// Wire format of the rerank request body
#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

/// Expected response shape; a response missing `results` is a failure
#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankEntry>,
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    relevance_score: f32,
    #[serde(default)]
    #[allow(dead_code)]
    document: Option<String>,
}

/// Client for the external rerank endpoint
pub struct Reranker {
    client: Client,
    settings: RerankSettings,
    telemetry: TelemetryCollector,
}

impl Reranker {
    /// Build a reranker with a bounded per-request timeout
    pub fn new(settings: RerankSettings, telemetry: TelemetryCollector) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(EngineError::Http)?;

        Ok(Self {
            client,
            settings,
            telemetry,
        })
    }

    /// Final result budget
    pub fn final_top_k(&self) -> usize {
        self.settings.final_top_k
    }

    /// Rerank `candidates` for `query`, or fall back to their original order
    ///
    /// Policy, in order: skip when disabled or unconfigured; skip when the
    /// candidate count is below the volume threshold (threshold 0 disables
    /// that check); otherwise call the endpoint, trying each path variant
    /// until one returns a usable response. Every skip and failure path
    /// returns the original order truncated to `final_top_k`.
    pub async fn rerank(&self, query: &str, candidates: Vec<Candidate>) -> RerankOutcome {
        let final_top_k = self.settings.final_top_k;

        if !self.settings.enabled
            || self.settings.api_url.trim().is_empty()
            || self.settings.model.trim().is_empty()
        {
            self.telemetry.record(PipelineEvent::RerankSkipped {
                reason: "reranking disabled".to_string(),
                timestamp: Instant::now(),
            });
            return passthrough(candidates, final_top_k);
        }

        if self.settings.threshold > 0 && candidates.len() < self.settings.threshold {
            self.telemetry.record(PipelineEvent::RerankSkipped {
                reason: format!(
                    "{} candidates below threshold {}",
                    candidates.len(),
                    self.settings.threshold
                ),
                timestamp: Instant::now(),
            });
            return passthrough(candidates, final_top_k);
        }

        match self.call_endpoint(query, &candidates).await {
            Ok((ranked, endpoint)) => {
                self.telemetry.record(PipelineEvent::RerankCompleted {
                    candidates: ranked.len(),
                    endpoint,
                    timestamp: Instant::now(),
                });
                RerankOutcome::Reranked(ranked)
            }
            Err(err) => {
                self.telemetry.record(PipelineEvent::RerankFallback {
                    error: err.to_string(),
                    timestamp: Instant::now(),
                });
                passthrough(candidates, final_top_k)
            }
        }
    }

    /// Try each configured path variant in order; first usable response wins
    async fn call_endpoint(
        &self,
        query: &str,
        candidates: &[Candidate],
    ) -> anyhow::Result<(Vec<RankedCandidate>, String)> {
        let documents: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let base = self.settings.api_url.trim_end_matches('/');

        let mut last_err = anyhow!("no rerank path variants configured");
        for variant in &self.settings.path_variants {
            let url = format!("{}{}", base, variant);
            match self.try_variant(&url, query, &documents).await {
                Ok(entries) => {
                    let ranked = self.map_entries(entries, candidates);
                    return Ok((ranked, url));
                }
                Err(err) => {
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    async fn try_variant(
        &self,
        url: &str,
        query: &str,
        documents: &[&str],
    ) -> anyhow::Result<Vec<RerankEntry>> {
        let request = RerankRequest {
            model: &self.settings.model,
            query,
            documents: documents.to_vec(),
            top_n: self.settings.final_top_k,
        };

        let response = self
            .client
            .post(url)
            .header(
                "Authorization",
                format!("Bearer {}", self.settings.api_key),
            )
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach rerank endpoint {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Rerank endpoint {} returned {}", url, response.status());
        }

        let body: RerankResponse = response
            .json()
            .await
            .with_context(|| format!("Malformed rerank response from {}", url))?;
        Ok(body.results)
    }

    /// Map endpoint entries back onto the submitted candidates
    ///
    /// Entries referencing positions outside the submitted list are
    /// dropped; the endpoint's ordering is preserved otherwise.
    fn map_entries(
        &self,
        entries: Vec<RerankEntry>,
        candidates: &[Candidate],
    ) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = entries
            .into_iter()
            .filter_map(|entry| {
                candidates.get(entry.index).map(|candidate| RankedCandidate {
                    candidate: candidate.clone(),
                    rerank_score: entry.relevance_score,
                    original_index: entry.index,
                })
            })
            .collect();
        ranked.truncate(self.settings.final_top_k);
        ranked
    }
}

/// Original order, truncated to the final budget
fn passthrough(mut candidates: Vec<Candidate>, final_top_k: usize) -> RerankOutcome {
    candidates.truncate(final_top_k);
    RerankOutcome::Passthrough(candidates)
}
