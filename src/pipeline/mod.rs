//! End-to-end retrieval pipeline: recall → dedup → rerank → cache
//!
//! `execute` is guarded by a compare-and-swap single-flight flag: a call
//! arriving while another is in flight is rejected with `Skipped`, never
//! queued. No backend failure propagates out of `execute`; total backend
//! failure yields an empty result list.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::cache::SlotCache;
use crate::config::EngineConfig;
use crate::dedup::dedupe;
use crate::errors::Result;
use crate::prefetch::{PredictivePrefetcher, PrefetchState};
use crate::recall::keyword::{KeywordRecall, LexicalIndex};
use crate::recall::orchestrator::RecallOrchestrator;
use crate::recall::semantic::{SemanticRecall, VectorBackend};
use crate::recall::source::Candidate;
use crate::rerank::{Reranker, RerankOutcome};
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// Result of one `execute` call
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    /// The pipeline ran (or was served from cache) and produced a report
    Completed(RecallReport),
    /// Another execution held the single-flight flag; nothing ran
    Skipped,
}

impl ExecuteOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ExecuteOutcome::Skipped)
    }

    /// Unwrap the report, if the pipeline ran
    pub fn report(self) -> Option<RecallReport> {
        match self {
            ExecuteOutcome::Completed(report) => Some(report),
            ExecuteOutcome::Skipped => None,
        }
    }
}

/// Structured outcome of a pipeline run
///
/// Carries diagnostic metadata alongside the ranked results; the caller
/// decides whether to publish any of it as host events.
#[derive(Debug, Clone)]
pub struct RecallReport {
    /// Unique id for this run
    pub id: Uuid,
    /// The query the pipeline ran for
    pub query: String,
    /// Final ordered results
    pub results: RerankOutcome,
    /// Candidates produced by recall before deduplication
    pub candidates_recalled: usize,
    /// Candidates surviving deduplication
    pub candidates_deduped: usize,
    /// Served from the last-result cache without running recall
    pub cache_hit: bool,
    /// Recall output reused from the predictive prefetch cache
    pub prefetch_hit: bool,
    /// Whether the external endpoint produced the final ordering
    pub reranked: bool,
    /// Wall-clock duration of this run
    pub elapsed_ms: u64,
    /// Completion timestamp
    pub created_at: DateTime<Utc>,
}

/// The retrieval pipeline
pub struct RecallPipeline {
    orchestrator: Arc<RecallOrchestrator>,
    reranker: Reranker,
    prefetcher: PredictivePrefetcher,
    last_result_cache: SlotCache<RerankOutcome>,
    prefetch_cache: Arc<SlotCache<Vec<Candidate>>>,
    busy: AtomicBool,
    telemetry: TelemetryCollector,
}

impl RecallPipeline {
    /// Build a pipeline from validated configuration and injected sources
    ///
    /// Rejects invalid configuration instead of clamping it.
    pub fn new(
        config: &EngineConfig,
        orchestrator: RecallOrchestrator,
        telemetry: TelemetryCollector,
    ) -> Result<Self> {
        config.validate()?;

        let orchestrator = Arc::new(orchestrator);
        let prefetch_cache = Arc::new(SlotCache::new(Duration::from_millis(
            config.cache.prefetch_ttl_ms,
        )));
        let reranker = Reranker::new(config.rerank.clone(), telemetry.clone())?;
        let prefetcher = PredictivePrefetcher::new(
            config.predictive.clone(),
            config.recall.clone(),
            Arc::clone(&orchestrator),
            Arc::clone(&prefetch_cache),
            telemetry.clone(),
        );

        Ok(Self {
            orchestrator,
            reranker,
            prefetcher,
            last_result_cache: SlotCache::new(Duration::from_millis(
                config.cache.last_result_ttl_ms,
            )),
            prefetch_cache,
            busy: AtomicBool::new(false),
            telemetry,
        })
    }

    /// Build a pipeline wiring keyword and semantic recall from injected
    /// backends
    ///
    /// A source is enabled by providing its backend: no lexical index means
    /// no keyword recall runs, an empty vector-backend list means no
    /// semantic recall. Per-source budgets and the source call timeout come
    /// from `config.recall`.
    pub fn from_backends(
        config: &EngineConfig,
        lexical_index: Option<Arc<dyn LexicalIndex>>,
        vector_backends: Vec<Arc<dyn VectorBackend>>,
        telemetry: TelemetryCollector,
    ) -> Result<Self> {
        let mut orchestrator = RecallOrchestrator::new(telemetry.clone())
            .with_timeout(Duration::from_millis(config.recall.source_timeout_ms));

        if let Some(index) = lexical_index {
            let keyword = KeywordRecall::new(
                index,
                config.recall.max_keywords,
                config.recall.min_keyword_length,
                telemetry.clone(),
            );
            orchestrator =
                orchestrator.with_source(Arc::new(keyword), config.recall.keyword_top_k);
        }

        if !vector_backends.is_empty() {
            let semantic = SemanticRecall::new(vector_backends, telemetry.clone());
            orchestrator =
                orchestrator.with_source(Arc::new(semantic), config.recall.semantic_top_k);
        }

        Self::new(config, orchestrator, telemetry)
    }

    /// Run the pipeline for a generation-start query
    ///
    /// Order of checks: fresh last-result cache entry, then a prefetched
    /// recall set (still passed through the reranker, which is
    /// query-sensitive), then the full recall → dedup → rerank path.
    pub async fn execute(&self, query: &str) -> ExecuteOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.telemetry.record(PipelineEvent::ExecutionSkipped {
                query: query.to_string(),
                timestamp: Instant::now(),
            });
            return ExecuteOutcome::Skipped;
        }

        let report = self.run(query).await;
        self.busy.store(false, Ordering::SeqCst);
        ExecuteOutcome::Completed(report)
    }

    async fn run(&self, query: &str) -> RecallReport {
        let started = Instant::now();

        if let Some(results) = self.last_result_cache.get(query) {
            self.telemetry.record(PipelineEvent::CacheHit {
                query: query.to_string(),
                timestamp: Instant::now(),
            });
            return self.make_report(query, results, 0, 0, true, false, started);
        }

        if let Some(recalled) = self.prefetch_cache.get(query) {
            self.telemetry.record(PipelineEvent::PrefetchHit {
                query: query.to_string(),
                timestamp: Instant::now(),
            });
            let recalled_count = recalled.len();
            let results = self.reranker.rerank(query, recalled).await;
            self.last_result_cache.put(query, results.clone());
            return self.make_report(
                query,
                results,
                recalled_count,
                recalled_count,
                false,
                true,
                started,
            );
        }

        let merged = self.orchestrator.multi_recall(query).await;
        let recalled_count = merged.len();
        let deduped = dedupe(merged);
        let deduped_count = deduped.len();
        self.telemetry.record(PipelineEvent::Deduplicated {
            before: recalled_count,
            after: deduped_count,
            timestamp: Instant::now(),
        });

        let results = self.reranker.rerank(query, deduped).await;
        self.last_result_cache.put(query, results.clone());
        self.make_report(
            query,
            results,
            recalled_count,
            deduped_count,
            false,
            false,
            started,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn make_report(
        &self,
        query: &str,
        results: RerankOutcome,
        candidates_recalled: usize,
        candidates_deduped: usize,
        cache_hit: bool,
        prefetch_hit: bool,
        started: Instant,
    ) -> RecallReport {
        RecallReport {
            id: Uuid::new_v4(),
            query: query.to_string(),
            reranked: results.was_reranked(),
            results,
            candidates_recalled,
            candidates_deduped,
            cache_hit,
            prefetch_hit,
            elapsed_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        }
    }

    /// Forward an input-change event to the predictive prefetcher
    pub fn input_changed(&self, partial_text: &str, recent_messages: &[String]) {
        self.prefetcher.input_changed(partial_text, recent_messages);
    }

    /// Handle a chat switch: clear both caches, reset the prefetcher
    pub fn chat_switched(&self) {
        self.last_result_cache.clear();
        self.prefetch_cache.clear();
        self.prefetcher.reset();
    }

    /// Current prefetcher state
    pub fn prefetch_state(&self) -> PrefetchState {
        self.prefetcher.state()
    }

    /// Shared telemetry collector
    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recall::source::{CandidateSource, RecallSource};
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        results: Vec<(String, f32)>,
    }

    #[async_trait]
    impl RecallSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn source(&self) -> CandidateSource {
            CandidateSource::Corpus
        }

        async fn recall(&self, _query: &str, top_k: usize) -> AnyResult<Vec<Candidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out: Vec<Candidate> = self
                .results
                .iter()
                .map(|(text, score)| {
                    Candidate::new(text.clone(), *score, CandidateSource::Corpus)
                })
                .collect();
            out.truncate(top_k);
            Ok(out)
        }
    }

    fn make_pipeline(calls: Arc<AtomicUsize>) -> RecallPipeline {
        let telemetry = TelemetryCollector::new();
        let orchestrator = RecallOrchestrator::new(telemetry.clone()).with_source(
            Arc::new(CountingSource {
                calls,
                results: vec![
                    ("fragment one".to_string(), 0.9),
                    ("fragment two".to_string(), 0.7),
                ],
            }),
            10,
        );
        RecallPipeline::new(&EngineConfig::default(), orchestrator, telemetry).unwrap()
    }

    #[tokio::test]
    async fn test_execute_produces_report() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = make_pipeline(Arc::clone(&calls));

        let report = pipeline.execute("query").await.report().unwrap();
        assert_eq!(report.query, "query");
        assert_eq!(report.candidates_recalled, 2);
        assert_eq!(report.candidates_deduped, 2);
        assert!(!report.cache_hit);
        assert!(!report.reranked);
        assert_eq!(report.results.texts(), vec!["fragment one", "fragment two"]);
    }

    #[tokio::test]
    async fn test_identical_consecutive_query_hits_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = make_pipeline(Arc::clone(&calls));

        let first = pipeline.execute("query").await.report().unwrap();
        let second = pipeline.execute("query").await.report().unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.results.texts(), second.results.texts());
    }

    #[tokio::test]
    async fn test_chat_switched_clears_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = make_pipeline(Arc::clone(&calls));

        pipeline.execute("query").await;
        pipeline.chat_switched();
        let report = pipeline.execute("query").await.report().unwrap();

        assert!(!report.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pipeline.prefetch_state(), PrefetchState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_at_construction() {
        let telemetry = TelemetryCollector::new();
        let orchestrator = RecallOrchestrator::new(telemetry.clone());
        let mut config = EngineConfig::default();
        config.rerank.final_top_k = 0;

        assert!(RecallPipeline::new(&config, orchestrator, telemetry).is_err());
    }

    #[tokio::test]
    async fn test_empty_backends_yield_empty_result_not_error() {
        let telemetry = TelemetryCollector::new();
        let orchestrator = RecallOrchestrator::new(telemetry.clone());
        let pipeline =
            RecallPipeline::new(&EngineConfig::default(), orchestrator, telemetry).unwrap();

        let report = pipeline.execute("query").await.report().unwrap();
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_from_backends_with_nothing_injected_runs_empty() {
        let pipeline = RecallPipeline::from_backends(
            &EngineConfig::default(),
            None,
            Vec::new(),
            TelemetryCollector::new(),
        )
        .unwrap();

        let report = pipeline.execute("query").await.report().unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.candidates_recalled, 0);
    }
}
