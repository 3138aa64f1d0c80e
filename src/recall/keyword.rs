//! Keyword recall adapter over an external lexical index

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::keywords::KeywordExtractor;
use crate::recall::source::{Candidate, CandidateSource, RecallSource};
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// External lexical index queried one keyword at a time
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    /// Look up entries matching a single keyword
    async fn lookup(&self, keyword: &str, top_k: usize) -> Result<Vec<Candidate>>;
}

/// Recall source backed by per-keyword lexical lookups
///
/// Extracts keywords from the query, issues one lookup per keyword, merges
/// the hits, and keeps the `top_k` best by backend score. A failed lookup
/// contributes nothing; the remaining keywords still run.
pub struct KeywordRecall {
    index: Arc<dyn LexicalIndex>,
    extractor: KeywordExtractor,
    max_keywords: usize,
    min_keyword_length: usize,
    telemetry: TelemetryCollector,
}

impl KeywordRecall {
    pub fn new(
        index: Arc<dyn LexicalIndex>,
        max_keywords: usize,
        min_keyword_length: usize,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            index,
            extractor: KeywordExtractor::new(),
            max_keywords,
            min_keyword_length,
            telemetry,
        }
    }
}

#[async_trait]
impl RecallSource for KeywordRecall {
    fn name(&self) -> &str {
        "keyword"
    }

    fn source(&self) -> CandidateSource {
        CandidateSource::Keyword
    }

    async fn recall(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>> {
        let keywords = self
            .extractor
            .extract(query, self.max_keywords, self.min_keyword_length);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Candidate> = Vec::new();
        for keyword in &keywords {
            match self.index.lookup(keyword, top_k).await {
                Ok(results) => hits.extend(results),
                Err(err) => {
                    self.telemetry.record(PipelineEvent::SourceFailed {
                        source: format!("keyword:{}", keyword),
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
