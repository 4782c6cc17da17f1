//! Score-update strategies.
//!
//! The simulator owns candidate selection, iteration counting and the
//! zero floor; a strategy only proposes how much a selected candidate's
//! score moves. Swapping the strategy never touches the state machine.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::candidate::CandidateScore;

/// Proposes a score increment for the candidate chosen on this tick.
pub trait ScoringStrategy: Send + Sync {
    /// Signed increment to add to `candidate.score`.
    fn increment(&self, candidate: &CandidateScore, rng: &mut dyn RngCore) -> f64;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Bounded random walk: `(u - offset) * magnitude` with `u ~ U[0, 1)`.
///
/// Increments fall in `[-offset * magnitude, (1 - offset) * magnitude)`.
/// With `offset > 0.5` the mean increment is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalk {
    pub magnitude: f64,
    pub offset: f64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            magnitude: 20.0,
            offset: 0.55,
        }
    }
}

impl RandomWalk {
    pub fn new(magnitude: f64, offset: f64) -> Self {
        Self { magnitude, offset }
    }

    /// Mean increment per selection.
    pub fn expected_increment(&self) -> f64 {
        (0.5 - self.offset) * self.magnitude
    }

    /// Inclusive lower / exclusive upper bound of a single increment.
    pub fn bounds(&self) -> (f64, f64) {
        (
            -self.offset * self.magnitude,
            (1.0 - self.offset) * self.magnitude,
        )
    }
}

impl ScoringStrategy for RandomWalk {
    fn increment(&self, _candidate: &CandidateScore, rng: &mut dyn RngCore) -> f64 {
        let u: f64 = rng.gen();
        (u - self.offset) * self.magnitude
    }

    fn name(&self) -> &'static str {
        "random_walk"
    }
}
