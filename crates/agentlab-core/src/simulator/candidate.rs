//! The fixed candidate set and per-candidate score tracking.

use serde::{Deserialize, Serialize};

/// The five candidate models, in tie-breaking order.
pub const CANDIDATES: [&str; 5] = ["GPT-4", "Claude-3", "Gemini", "LLaMA-2", "PaLM-2"];

/// Running score for one candidate within a single experiment run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateScore {
    pub name: String,
    /// Never negative.
    pub score: f64,
    pub attempts: u32,
}

impl CandidateScore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0.0,
            attempts: 0,
        }
    }
}

/// Fresh zeroed scores for every candidate, in fixed order.
pub fn initial_scores() -> Vec<CandidateScore> {
    CANDIDATES.iter().map(|name| CandidateScore::new(*name)).collect()
}

/// Highest-scoring candidate.
///
/// Walks the list in order and replaces the running best only on a strictly
/// greater score, so ties go to the earliest candidate. Returns `None` only
/// for an empty slice.
pub fn leader(scores: &[CandidateScore]) -> Option<&CandidateScore> {
    let (first, rest) = scores.split_first()?;
    Some(rest.iter().fold(first, |best, current| {
        if current.score > best.score {
            current
        } else {
            best
        }
    }))
}
