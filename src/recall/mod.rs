// Multi-source recall: candidate types, source adapters, and orchestration.
//
// Components:
// - RecallSource: injected interface over one retrieval backend
// - KeywordRecall: per-keyword lookups against a lexical index
// - SemanticRecall: vector search across one or more backends
// - RecallOrchestrator: concurrent fan-out with deterministic merge order

pub mod source;
pub mod keyword;
pub mod semantic;
pub mod orchestrator;

// Re-export key types
pub use source::{Candidate, CandidateSource, RecallSource};
pub use keyword::{KeywordRecall, LexicalIndex};
pub use semantic::{SemanticRecall, VectorBackend};
pub use orchestrator::RecallOrchestrator;
