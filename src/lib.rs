//! chatrecall - Hybrid context retrieval for LLM chat sessions
//!
//! Retrieves relevant prior context (corpus text, memory fragments,
//! summaries) before each generation turn and ranks it so the most useful
//! pieces are injected first.
//!
//! # Architecture
//!
//! - **Recall**: keyword and semantic sources queried through injected
//!   backend interfaces, merged in deterministic source order
//! - **Dedup**: exact-text collapse, first occurrence wins
//! - **Rerank**: optional external scoring endpoint with a volume
//!   threshold and a truncate-to-original-order fallback
//! - **Caching**: two single-slot TTL caches (last result + prefetch)
//! - **Prediction**: debounced prefetcher that guesses the next query
//!   from in-progress input and runs recall ahead of time

// Core pipeline stages
pub mod errors;
pub mod config;
pub mod keywords;
pub mod recall;
pub mod dedup;
pub mod rerank;
pub mod cache;

// Speculation and orchestration
pub mod prefetch;
pub mod pipeline;

// Observability
pub mod telemetry;

// Re-export commonly used types
pub use config::EngineConfig;
pub use errors::{EngineError, Result};
pub use pipeline::{ExecuteOutcome, RecallPipeline, RecallReport};
pub use recall::{
    Candidate, CandidateSource, LexicalIndex, RecallOrchestrator, RecallSource, VectorBackend,
};
pub use rerank::{RankedCandidate, RerankOutcome};
