//! Order-preserving candidate deduplication
//!
//! Key is the trimmed candidate text, compared exactly. The first
//! occurrence wins regardless of source or score; a duplicate from a
//! later source is dropped even if its backend scored it higher.

use std::collections::HashSet;

use crate::recall::source::Candidate;

/// Collapse candidates with identical trimmed text, keeping first-seen
///
/// Candidates whose text trims to empty are dropped up front so they
/// cannot collapse onto a shared empty key.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = candidate.text.trim();
        if key.is_empty() {
            continue;
        }
        if seen.insert(key.to_string()) {
            out.push(candidate);
        }
    }
    out
}
