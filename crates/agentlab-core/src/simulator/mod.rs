//! Experiment simulator state machine.
//!
//! `Idle → Running → Complete`, with `Cancelled` as a second terminal state
//! reachable only from `Running`. The machine owns its counters and score
//! table and is advanced only by [`Simulator::tick`]; the caller supplies the
//! cadence (see [`crate::runner`]).

pub mod candidate;
pub mod scoring;

use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{Agent, AgentId, ExperimentRequest, LabError, Result};
use crate::metrics::METRICS;

pub use candidate::{initial_scores, leader, CandidateScore, CANDIDATES};
pub use scoring::{RandomWalk, ScoringStrategy};

/// Lifecycle state of a simulator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorState {
    Idle,
    Running,
    Complete,
    Cancelled,
}

impl SimulatorState {
    /// Whether no further ticks can change anything.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimulatorState::Complete | SimulatorState::Cancelled)
    }
}

/// Point-in-time view of a run, emitted after every tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentSnapshot {
    pub current_iteration: u32,
    pub max_iterations: u32,
    pub scores: Vec<CandidateScore>,
}

impl ExperimentSnapshot {
    /// Total attempts across candidates; equals `current_iteration`.
    pub fn total_attempts(&self) -> u32 {
        self.scores.iter().map(|c| c.attempts).sum()
    }
}

/// Final result of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentOutcome {
    pub experiment: String,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub winner: String,
    pub winner_score: f64,
    pub snapshot: ExperimentSnapshot,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// One candidate was scored.
    Progress(ExperimentSnapshot),
    /// The budget was exhausted; the machine is now `Complete`.
    Completed(ExperimentOutcome),
    /// The machine is not running; nothing changed.
    Halted(SimulatorState),
}

/// One experiment view's simulator.
pub struct Simulator {
    state: SimulatorState,
    strategy: Arc<dyn ScoringStrategy>,
    request: Option<ExperimentRequest>,
    agent: Option<Agent>,
    current_iteration: u32,
    scores: Vec<CandidateScore>,
    outcome: Option<ExperimentOutcome>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("state", &self.state)
            .field("strategy", &self.strategy.name())
            .field("current_iteration", &self.current_iteration)
            .field("scores", &self.scores)
            .finish_non_exhaustive()
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(Arc::new(RandomWalk::default()))
    }
}

impl Simulator {
    pub fn new(strategy: Arc<dyn ScoringStrategy>) -> Self {
        Self {
            state: SimulatorState::Idle,
            strategy,
            request: None,
            agent: None,
            current_iteration: 0,
            scores: initial_scores(),
            outcome: None,
        }
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn current_iteration(&self) -> u32 {
        self.current_iteration
    }

    pub fn request(&self) -> Option<&ExperimentRequest> {
        self.request.as_ref()
    }

    /// The agent this run was started for (a copy, for display).
    pub fn agent(&self) -> Option<&Agent> {
        self.agent.as_ref()
    }

    pub fn scores(&self) -> &[CandidateScore] {
        &self.scores
    }

    pub fn outcome(&self) -> Option<&ExperimentOutcome> {
        self.outcome.as_ref()
    }

    pub fn snapshot(&self) -> ExperimentSnapshot {
        ExperimentSnapshot {
            current_iteration: self.current_iteration,
            max_iterations: self.request.as_ref().map_or(0, |r| r.max_iterations),
            scores: self.scores.clone(),
        }
    }

    /// Validate `request` and enter `Running` with a fresh score table.
    ///
    /// May be called from `Idle` or from a terminal state to start another
    /// run.
    ///
    /// # Errors
    ///
    /// - `LabError::AlreadyRunning` if a run is in progress.
    /// - `LabError::Validation` naming the offending request field.
    /// - `LabError::AgentNotFound` if `agent` is not the agent the request
    ///   references.
    ///
    /// State is unchanged on error.
    pub fn start(&mut self, request: ExperimentRequest, agent: &Agent) -> Result<()> {
        if self.state == SimulatorState::Running {
            return Err(LabError::AlreadyRunning);
        }
        request.validate()?;
        if request.agent_id != agent.id {
            return Err(LabError::AgentNotFound(request.agent_id));
        }

        self.scores = initial_scores();
        self.current_iteration = 0;
        self.outcome = None;
        self.agent = Some(agent.clone());
        self.request = Some(request);
        self.state = SimulatorState::Running;
        Ok(())
    }

    /// Advance by one scheduled tick.
    ///
    /// Checks state first: a machine that is not `Running` is never mutated.
    /// Once the budget is spent the next tick computes the winner and
    /// completes instead of scoring.
    pub fn tick(&mut self, rng: &mut dyn RngCore) -> TickOutcome {
        if self.state != SimulatorState::Running {
            return TickOutcome::Halted(self.state);
        }
        let max_iterations = self.request.as_ref().map_or(0, |r| r.max_iterations);

        if self.current_iteration >= max_iterations {
            return TickOutcome::Completed(self.complete());
        }

        let index = rng.gen_range(0..self.scores.len());
        let delta = self.strategy.increment(&self.scores[index], rng);
        let candidate = &mut self.scores[index];
        candidate.score = (candidate.score + delta).max(0.0);
        candidate.attempts += 1;
        self.current_iteration += 1;

        METRICS.inc_ticks();
        trace!(
            iteration = self.current_iteration,
            candidate = %candidate.name,
            score = candidate.score,
            "tick"
        );
        TickOutcome::Progress(self.snapshot())
    }

    /// Stop a running experiment. Returns `false` if it was not running.
    pub fn cancel(&mut self) -> bool {
        if self.state != SimulatorState::Running {
            return false;
        }
        self.state = SimulatorState::Cancelled;
        true
    }

    fn complete(&mut self) -> ExperimentOutcome {
        let (winner, winner_score) = leader(&self.scores)
            .map(|c| (c.name.clone(), c.score))
            .unwrap_or_default();
        let outcome = ExperimentOutcome {
            experiment: self
                .request
                .as_ref()
                .map(|r| r.name.clone())
                .unwrap_or_default(),
            agent_id: self.agent.as_ref().map(|a| a.id).unwrap_or_default(),
            agent_name: self
                .agent
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            winner,
            winner_score,
            snapshot: self.snapshot(),
        };
        self.state = SimulatorState::Complete;
        self.outcome = Some(outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AgentDraft;
    use crate::registry::AgentRegistry;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Always adds a fixed amount; makes winners predictable.
    struct Fixed(f64);

    impl ScoringStrategy for Fixed {
        fn increment(&self, _candidate: &CandidateScore, _rng: &mut dyn RngCore) -> f64 {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn agent() -> Agent {
        let mut registry = AgentRegistry::new();
        registry
            .create(AgentDraft::new("Scout", "Explorer", "Map", "Sailor"))
            .expect("create agent")
    }

    fn run_to_end(sim: &mut Simulator, rng: &mut ChaCha8Rng) -> (u32, ExperimentOutcome) {
        let mut progress = 0;
        loop {
            match sim.tick(rng) {
                TickOutcome::Progress(_) => progress += 1,
                TickOutcome::Completed(outcome) => return (progress, outcome),
                TickOutcome::Halted(state) => panic!("unexpected halt in {state:?}"),
            }
        }
    }

    #[test]
    fn test_new_simulator_is_idle() {
        let sim = Simulator::default();
        assert_eq!(sim.state(), SimulatorState::Idle);
        assert_eq!(sim.snapshot().max_iterations, 0);
    }

    #[test]
    fn test_tick_while_idle_is_noop() {
        let mut sim = Simulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sim.tick(&mut rng), TickOutcome::Halted(SimulatorState::Idle));
        assert_eq!(sim.current_iteration(), 0);
    }

    #[test]
    fn test_invalid_start_stays_idle() {
        let agent = agent();
        let mut sim = Simulator::default();
        let err = sim
            .start(ExperimentRequest::new(agent.id, "Run", "Prompt", 0), &agent)
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(sim.state(), SimulatorState::Idle);

        let err = sim
            .start(ExperimentRequest::new(agent.id, "", "Prompt", 5), &agent)
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(sim.state(), SimulatorState::Idle);
    }

    #[test]
    fn test_start_rejects_mismatched_agent() {
        let agent = agent();
        let mut sim = Simulator::default();
        let err = sim
            .start(ExperimentRequest::new(AgentId::new(), "Run", "P", 5), &agent)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(sim.state(), SimulatorState::Idle);
    }

    #[test]
    fn test_run_emits_exactly_n_progress_ticks() {
        let agent = agent();
        let mut sim = Simulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        sim.start(ExperimentRequest::new(agent.id, "Run", "P", 17), &agent)
            .expect("start");

        let (progress, outcome) = run_to_end(&mut sim, &mut rng);
        assert_eq!(progress, 17);
        assert_eq!(sim.current_iteration(), 17);
        assert_eq!(outcome.snapshot.current_iteration, 17);
        assert_eq!(outcome.snapshot.total_attempts(), 17);
        assert_eq!(outcome.agent_name, "Scout");
        assert_eq!(sim.state(), SimulatorState::Complete);
        assert_eq!(sim.outcome(), Some(&outcome));
    }

    #[test]
    fn test_invariants_hold_every_tick() {
        let agent = agent();
        let mut sim = Simulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        sim.start(ExperimentRequest::new(agent.id, "Run", "P", 100), &agent)
            .expect("start");

        while let TickOutcome::Progress(snapshot) = sim.tick(&mut rng) {
            assert_eq!(snapshot.total_attempts(), snapshot.current_iteration);
            assert!(snapshot.scores.iter().all(|c| c.score >= 0.0));
        }
    }

    #[test]
    fn test_winner_is_argmax_with_first_tie_break() {
        let agent = agent();
        let mut sim = Simulator::new(Arc::new(Fixed(0.0)));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        sim.start(ExperimentRequest::new(agent.id, "Run", "P", 10), &agent)
            .expect("start");

        let (_, outcome) = run_to_end(&mut sim, &mut rng);
        // Every score is zero, so the first candidate wins the tie.
        assert_eq!(outcome.winner, CANDIDATES[0]);
        assert_eq!(outcome.winner_score, 0.0);
    }

    #[test]
    fn test_winner_matches_leader_of_final_scores() {
        let agent = agent();
        let mut sim = Simulator::new(Arc::new(Fixed(1.0)));
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        sim.start(ExperimentRequest::new(agent.id, "Run", "P", 40), &agent)
            .expect("start");

        let (_, outcome) = run_to_end(&mut sim, &mut rng);
        let expected = leader(&outcome.snapshot.scores).expect("leader");
        assert_eq!(outcome.winner, expected.name);
        assert_eq!(outcome.winner_score, expected.score);
        // With a constant +1 the score equals the attempt count.
        assert_eq!(outcome.winner_score, expected.attempts as f64);
    }

    #[test]
    fn test_negative_strategy_is_floored_at_zero() {
        let agent = agent();
        let mut sim = Simulator::new(Arc::new(Fixed(-50.0)));
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        sim.start(ExperimentRequest::new(agent.id, "Run", "P", 20), &agent)
            .expect("start");
        let (_, outcome) = run_to_end(&mut sim, &mut rng);
        assert!(outcome.snapshot.scores.iter().all(|c| c.score == 0.0));
    }

    #[test]
    fn test_cancel_stops_mutation() {
        let agent = agent();
        let mut sim = Simulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        sim.start(ExperimentRequest::new(agent.id, "Run", "P", 50), &agent)
            .expect("start");
        for _ in 0..5 {
            sim.tick(&mut rng);
        }
        let before = sim.snapshot();

        assert!(sim.cancel());
        assert_eq!(
            sim.tick(&mut rng),
            TickOutcome::Halted(SimulatorState::Cancelled)
        );
        assert_eq!(sim.snapshot(), before);
        assert!(!sim.cancel());
        assert!(sim.outcome().is_none());
    }

    #[test]
    fn test_start_while_running_rejected() {
        let agent = agent();
        let mut sim = Simulator::default();
        sim.start(ExperimentRequest::new(agent.id, "Run", "P", 5), &agent)
            .expect("start");
        let err = sim
            .start(ExperimentRequest::new(agent.id, "Again", "P", 5), &agent)
            .unwrap_err();
        assert!(matches!(err, LabError::AlreadyRunning));
    }

    #[test]
    fn test_restart_after_completion_resets_scores() {
        let agent = agent();
        let mut sim = Simulator::new(Arc::new(Fixed(2.0)));
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        sim.start(ExperimentRequest::new(agent.id, "First", "P", 3), &agent)
            .expect("start");
        run_to_end(&mut sim, &mut rng);

        sim.start(ExperimentRequest::new(agent.id, "Second", "P", 2), &agent)
            .expect("restart");
        assert_eq!(sim.state(), SimulatorState::Running);
        assert_eq!(sim.current_iteration(), 0);
        assert!(sim.outcome().is_none());
        assert!(sim.scores().iter().all(|c| c.score == 0.0 && c.attempts == 0));
    }
}
