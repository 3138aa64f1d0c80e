//! Semantic recall adapter over one or more vector-search backends

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::recall::source::{Candidate, CandidateSource, RecallSource};
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// External vector-search backend
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Backend name for telemetry
    fn name(&self) -> &str;

    /// Search the backend for fragments similar to `query`
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>>;
}

/// Recall source fanning a single query across vector backends
///
/// Backends are queried in sequence and their outputs concatenated before
/// sorting and truncation. Each backend is optional: a failure is recorded
/// and skipped, never propagated.
pub struct SemanticRecall {
    backends: Vec<Arc<dyn VectorBackend>>,
    telemetry: TelemetryCollector,
}

impl SemanticRecall {
    pub fn new(backends: Vec<Arc<dyn VectorBackend>>, telemetry: TelemetryCollector) -> Self {
        Self {
            backends,
            telemetry,
        }
    }
}

#[async_trait]
impl RecallSource for SemanticRecall {
    fn name(&self) -> &str {
        "semantic"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::Semantic
    }

    async fn recall(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>> {
        let mut hits: Vec<Candidate> = Vec::new();

        for backend in &self.backends {
            match backend.search(query, top_k).await {
                Ok(results) => hits.extend(results),
                Err(err) => {
                    self.telemetry.record(PipelineEvent::SourceFailed {
                        source: format!("semantic:{}", backend.name()),
                        error: err.to_string(),
                        timestamp: Instant::now(),
                    });
                }
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}
