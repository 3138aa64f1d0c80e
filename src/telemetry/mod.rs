//! Pipeline telemetry
//!
//! Collects per-stage events and aggregate counters for the retrieval
//! pipeline. The pipeline records here instead of emitting host events;
//! callers drain the collector and publish however they like.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Pipeline event types
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    // Recall stage
    RecallCompleted {
        source: String,
        candidates: usize,
        timestamp: Instant,
    },
    SourceFailed {
        source: String,
        error: String,
        timestamp: Instant,
    },
    Deduplicated {
        before: usize,
        after: usize,
        timestamp: Instant,
    },

    // Rerank stage
    RerankCompleted {
        candidates: usize,
        endpoint: String,
        timestamp: Instant,
    },
    RerankSkipped {
        reason: String,
        timestamp: Instant,
    },
    RerankFallback {
        error: String,
        timestamp: Instant,
    },

    // Cache and prefetch
    CacheHit {
        query: String,
        timestamp: Instant,
    },
    PrefetchHit {
        query: String,
        timestamp: Instant,
    },
    PrefetchScheduled {
        timestamp: Instant,
    },
    PrefetchSuperseded {
        timestamp: Instant,
    },
    PrefetchStored {
        query: String,
        candidates: usize,
        timestamp: Instant,
    },

    // Pipeline control
    ExecutionSkipped {
        query: String,
        timestamp: Instant,
    },
}

/// Aggregate pipeline statistics
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub recalls_completed: usize,
    pub sources_failed: usize,
    pub dedup_passes: usize,
    pub reranks_completed: usize,
    pub reranks_skipped: usize,
    pub rerank_fallbacks: usize,
    pub cache_hits: usize,
    pub prefetch_hits: usize,
    pub prefetches_scheduled: usize,
    pub prefetches_superseded: usize,
    pub prefetches_stored: usize,
    pub executions_skipped: usize,
}

/// Telemetry collector shared across pipeline stages
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
    stats: Arc<Mutex<PipelineStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(PipelineStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: PipelineEvent) {
        {
            let mut stats = self.stats.lock().unwrap();
            match &event {
                PipelineEvent::RecallCompleted { .. } => {
                    stats.recalls_completed += 1;
                }
                PipelineEvent::SourceFailed { .. } => {
                    stats.sources_failed += 1;
                }
                PipelineEvent::Deduplicated { .. } => {
                    stats.dedup_passes += 1;
                }
                PipelineEvent::RerankCompleted { .. } => {
                    stats.reranks_completed += 1;
                }
                PipelineEvent::RerankSkipped { .. } => {
                    stats.reranks_skipped += 1;
                }
                PipelineEvent::RerankFallback { .. } => {
                    stats.rerank_fallbacks += 1;
                }
                PipelineEvent::CacheHit { .. } => {
                    stats.cache_hits += 1;
                }
                PipelineEvent::PrefetchHit { .. } => {
                    stats.prefetch_hits += 1;
                }
                PipelineEvent::PrefetchScheduled { .. } => {
                    stats.prefetches_scheduled += 1;
                }
                PipelineEvent::PrefetchSuperseded { .. } => {
                    stats.prefetches_superseded += 1;
                }
                PipelineEvent::PrefetchStored { .. } => {
                    stats.prefetches_stored += 1;
                }
                PipelineEvent::ExecutionSkipped { .. } => {
                    stats.executions_skipped += 1;
                }
            }
        }

        let mut events = self.events.lock().unwrap();
        events.push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> PipelineStats {
        self.stats.lock().unwrap().clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<PipelineEvent> {
        let events = self.events.lock().unwrap();
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Drain all collected events
    pub fn drain_events(&self) -> Vec<PipelineEvent> {
        let mut events = self.events.lock().unwrap();
        std::mem::take(&mut *events)
    }

    /// Fraction of recall invocations that completed
    pub fn source_success_rate(&self) -> f64 {
        let stats = self.stats.lock().unwrap();
        let total = stats.recalls_completed + stats.sources_failed;
        if total == 0 {
            1.0
        } else {
            stats.recalls_completed as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
