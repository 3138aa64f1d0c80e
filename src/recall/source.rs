//! Recall source interface and candidate types

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend family a candidate originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Keyword,
    Semantic,
    Corpus,
    Memory,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CandidateSource::Keyword => "keyword",
            CandidateSource::Semantic => "semantic",
            CandidateSource::Corpus => "corpus",
            CandidateSource::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// One retrieved context fragment with a backend-local relevance score
///
/// Score semantics are backend-local until the rerank stage normalizes
/// them; the pipeline only relies on relative order within a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// The fragment text
    pub text: String,
    /// Backend-provided relevance score
    pub score: f32,
    /// Originating backend family
    pub source: CandidateSource,
    /// Backend-specific metadata (timestamps, ids, panel fields)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
    /// Create a candidate without metadata
    pub fn new(text: impl Into<String>, score: f32, source: CandidateSource) -> Self {
        Self {
            text: text.into(),
            score,
            source,
            metadata: serde_json::Map::new(),
        }
    }
}

/// Interface over one retrieval backend
///
/// Implementations are injected at construction time; the orchestrator
/// never performs ambient backend lookups. Failures are best-effort: the
/// orchestrator maps an `Err` to an empty contribution and continues.
#[async_trait]
pub trait RecallSource: Send + Sync {
    /// Stable name for telemetry
    fn name(&self) -> &str;

    /// Source tag applied to candidates returned by this source
    fn source(&self) -> CandidateSource;

    /// Propose up to `top_k` candidates for `query`
    async fn recall(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>>;
}
