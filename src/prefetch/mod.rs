//! Predictive prefetching triggered by in-progress user input
//!
//! Implements a deterministic finite state machine:
//! - Safety: invalid transitions are rejected, never applied
//! - Debounce: a new input event during Debouncing supersedes the pending
//!   timer; an in-flight prediction or prefetch always runs to completion
//! - The prefetched result carries no rerank scores; reranking is applied
//!   at consumption time where the actual query is known

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::SlotCache;
use crate::config::{PredictiveConfig, RecallConfig};
use crate::dedup::dedupe;
use crate::errors::{EngineError, Result};
use crate::keywords::KeywordExtractor;
use crate::recall::orchestrator::RecallOrchestrator;
use crate::recall::source::Candidate;
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// Number of top keywords combined into the predicted query
const PREDICTED_QUERY_KEYWORDS: usize = 3;

/// Prefetcher execution states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefetchState {
    /// Waiting for input events
    Idle,

    /// Input received; debounce timer pending
    Debouncing,

    /// Timer fired; building the predicted query
    Predicting,

    /// Running recall for the predicted query
    Prefetching,
}

/// Events that trigger prefetcher state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchEvent {
    /// In-progress input changed
    InputChanged,

    /// Debounce timer elapsed with no further input
    DebounceElapsed,

    /// A non-empty predicted query was formed
    PredictionReady,

    /// The combined context produced no keywords
    PredictionEmpty,

    /// Prefetch finished, successfully or not
    PrefetchComplete,

    /// Chat switched; drop all prefetch state
    Reset,
}

impl PrefetchState {
    /// Attempt state transition with validation
    ///
    /// Valid transitions:
    /// 1. Idle        → Debouncing  (on: InputChanged)
    /// 2. Debouncing  → Debouncing  (on: InputChanged, restarts the timer)
    /// 3. Debouncing  → Predicting  (on: DebounceElapsed)
    /// 4. Predicting  → Prefetching (on: PredictionReady)
    /// 5. Predicting  → Idle        (on: PredictionEmpty)
    /// 6. Prefetching → Idle        (on: PrefetchComplete)
    /// 7. \*          → Idle        (on: Reset)
    pub fn transition(&self, event: PrefetchEvent) -> Result<PrefetchState> {
        use PrefetchEvent::*;
        use PrefetchState::*;

        // Reset can occur from any state
        if event == Reset {
            return Ok(Idle);
        }

        let next_state = match (self, event) {
            (Idle, InputChanged) => Debouncing,
            (Debouncing, InputChanged) => Debouncing,
            (Debouncing, DebounceElapsed) => Predicting,
            (Predicting, PredictionReady) => Prefetching,
            (Predicting, PredictionEmpty) => Idle,
            (Prefetching, PrefetchComplete) => Idle,

            (state, event) => {
                return Err(EngineError::InvalidTransition {
                    from: format!("{:?}", state),
                    to: format!("{:?}", event),
                    reason: "no such edge in the prefetch state machine".to_string(),
                });
            }
        };

        Ok(next_state)
    }
}

/// Observes user input and speculatively runs recall for a predicted query
pub struct PredictivePrefetcher {
    config: PredictiveConfig,
    recall_config: RecallConfig,
    extractor: KeywordExtractor,
    orchestrator: Arc<RecallOrchestrator>,
    cache: Arc<SlotCache<Vec<Candidate>>>,
    state: Arc<Mutex<PrefetchState>>,
    // Monotonic counter; a sleeping timer whose generation is stale has
    // been superseded and must not run its prediction
    generation: Arc<AtomicU64>,
    telemetry: TelemetryCollector,
}

impl PredictivePrefetcher {
    pub fn new(
        config: PredictiveConfig,
        recall_config: RecallConfig,
        orchestrator: Arc<RecallOrchestrator>,
        cache: Arc<SlotCache<Vec<Candidate>>>,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            config,
            recall_config,
            extractor: KeywordExtractor::new(),
            orchestrator,
            cache,
            state: Arc::new(Mutex::new(PrefetchState::Idle)),
            generation: Arc::new(AtomicU64::new(0)),
            telemetry,
        }
    }

    /// Current state machine position
    pub fn state(&self) -> PrefetchState {
        *self.state.lock().unwrap()
    }

    /// Handle an input-change event carrying the in-progress text
    ///
    /// Starts (or restarts) the debounce timer when the input is long
    /// enough. Events arriving while a prediction or prefetch is running
    /// are ignored; in-flight work is never cancelled.
    pub fn input_changed(&self, partial_text: &str, recent_messages: &[String]) {
        if !self.config.enabled {
            return;
        }
        if partial_text.chars().count() < self.config.min_input_length {
            return;
        }

        {
            let mut state = self.state.lock().unwrap();
            match *state {
                PrefetchState::Predicting | PrefetchState::Prefetching => return,
                PrefetchState::Debouncing => {
                    self.telemetry.record(PipelineEvent::PrefetchSuperseded {
                        timestamp: Instant::now(),
                    });
                }
                PrefetchState::Idle => {}
            }
            match state.transition(PrefetchEvent::InputChanged) {
                Ok(next) => *state = next,
                Err(_) => return,
            }
        }

        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.telemetry.record(PipelineEvent::PrefetchScheduled {
            timestamp: Instant::now(),
        });

        let window = recent_messages
            .len()
            .saturating_sub(self.config.context_window_size);
        let mut context: Vec<String> = recent_messages[window..].to_vec();
        context.push(partial_text.to_string());

        let delay = Duration::from_millis(self.config.delay_ms);
        let min_keyword_length = self.recall_config.min_keyword_length;
        let extractor = self.extractor.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let cache = Arc::clone(&self.cache);
        let state = Arc::clone(&self.state);
        let generation = Arc::clone(&self.generation);
        let telemetry = self.telemetry.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // A newer input event or a reset owns the state machine now
            if generation.load(Ordering::SeqCst) != my_generation {
                return;
            }

            if !apply(&state, PrefetchEvent::DebounceElapsed) {
                return;
            }

            let combined = context.join("\n");
            let keywords =
                extractor.extract(&combined, PREDICTED_QUERY_KEYWORDS, min_keyword_length);
            if keywords.is_empty() {
                apply(&state, PrefetchEvent::PredictionEmpty);
                return;
            }
            let predicted_query = keywords.join(" ");

            if !apply(&state, PrefetchEvent::PredictionReady) {
                return;
            }

            let recalled = orchestrator.multi_recall(&predicted_query).await;
            let deduped = dedupe(recalled);
            telemetry.record(PipelineEvent::PrefetchStored {
                query: predicted_query.clone(),
                candidates: deduped.len(),
                timestamp: Instant::now(),
            });
            cache.put(&predicted_query, deduped);

            apply(&state, PrefetchEvent::PrefetchComplete);
        });
    }

    /// Drop pending timers and return to Idle
    ///
    /// Does not clear the prefetch cache; the pipeline owns cache clearing
    /// on chat switch.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Ok(next) = state.transition(PrefetchEvent::Reset) {
            *state = next;
        }
    }
}

/// Apply an event to the shared state; returns false if the edge is
/// invalid (a concurrent reset moved the machine) and leaves state alone
fn apply(state: &Mutex<PrefetchState>, event: PrefetchEvent) -> bool {
    let mut state = state.lock().unwrap();
    match state.transition(event) {
        Ok(next) => {
            *state = next;
            true
        }
        Err(_) => false,
    }
}
