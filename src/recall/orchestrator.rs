//! Recall orchestration across enabled sources

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::recall::source::{Candidate, RecallSource};
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// Per-call bound applied when no timeout is configured
const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// One enabled source with its per-source result budget
struct SourceEntry {
    source: Arc<dyn RecallSource>,
    top_k: usize,
}

/// Fans a query across every enabled recall source and merges the results
///
/// Source calls run concurrently, but outputs are concatenated in the order
/// sources were registered, not arrival order, so downstream deduplication
/// stays deterministic. An empty merged list is a valid "no relevant
/// context" outcome, not an error.
pub struct RecallOrchestrator {
    sources: Vec<SourceEntry>,
    source_timeout: Duration,
    telemetry: TelemetryCollector,
}

impl RecallOrchestrator {
    /// Create an orchestrator with no sources registered
    pub fn new(telemetry: TelemetryCollector) -> Self {
        Self {
            sources: Vec::new(),
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            telemetry,
        }
    }

    /// Bound every source call; a call that exceeds the timeout is treated
    /// as a failed source
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Register an enabled source; registration order is merge order
    pub fn with_source(mut self, source: Arc<dyn RecallSource>, top_k: usize) -> Self {
        self.sources.push(SourceEntry { source, top_k });
        self
    }

    /// Number of registered sources
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Invoke every registered source and merge their candidates
    pub async fn multi_recall(&self, query: &str) -> Vec<Candidate> {
        let futures = self.sources.iter().map(|entry| {
            tokio::time::timeout(self.source_timeout, entry.source.recall(query, entry.top_k))
        });

        // join_all yields results in registration order regardless of
        // which network call finishes first
        let outputs = join_all(futures).await;

        let mut merged: Vec<Candidate> = Vec::new();
        for (entry, output) in self.sources.iter().zip(outputs) {
            match output {
                Ok(Ok(candidates)) => {
                    self.telemetry.record(PipelineEvent::RecallCompleted {
                        source: entry.source.name().to_string(),
                        candidates: candidates.len(),
                        timestamp: Instant::now(),
                    });
                    let tag = entry.source.source();
                    merged.extend(candidates.into_iter().map(|mut c| {
                        c.source = tag;
                        c
                    }));
                }
                Ok(Err(err)) => {
                    self.telemetry.record(PipelineEvent::SourceFailed {
                        source: entry.source.name().to_string(),
                        error: err.to_string(),
                        timestamp: Instant::now(),
                    });
                }
                Err(_) => {
                    self.telemetry.record(PipelineEvent::SourceFailed {
                        source: entry.source.name().to_string(),
                        error: format!(
                            "timed out after {}ms",
                            self.source_timeout.as_millis()
                        ),
                        timestamp: Instant::now(),
                    });
                }
            }
        }
        merged
    }
}
