//! Structured observability hooks for agent and experiment lifecycle events.
//!
//! This module provides:
//! - Experiment-scoped tracing spans via [`experiment_span`]
//! - Emission functions for lifecycle events: agent changes, experiment
//!   start, completion and cancellation
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use tracing::{info, Span};

/// Span tagging everything inside one experiment run.
///
/// The runner attaches it to its timer task with `Instrument`, so it stays
/// valid across `.await` points.
///
/// # Example
///
/// ```ignore
/// let span = experiment_span("Campaign", "Scout");
/// tokio::spawn(run_loop().instrument(span));
/// ```
pub fn experiment_span(experiment: &str, agent_name: &str) -> Span {
    tracing::info_span!(
        "agentlab.experiment",
        experiment = %experiment,
        agent = %agent_name
    )
}

/// Emit event: agent created, updated or deleted.
pub fn emit_agent_changed(action: &str, agent_id: &str, name: &str) {
    info!(event = "agent.changed", action = %action, agent_id = %agent_id, name = %name);
}

/// Emit event: experiment started.
pub fn emit_experiment_started(experiment: &str, agent_name: &str, max_iterations: u32) {
    info!(
        event = "experiment.started",
        experiment = %experiment,
        agent = %agent_name,
        max_iterations = max_iterations,
    );
}

/// Emit event: experiment completed with its winner.
pub fn emit_experiment_completed(experiment: &str, winner: &str, score: f64, iterations: u32) {
    info!(
        event = "experiment.completed",
        experiment = %experiment,
        winner = %winner,
        score = score,
        iterations = iterations,
    );
}

/// Emit event: experiment cancelled before completion.
pub fn emit_experiment_cancelled(experiment: &str, iteration: u32) {
    info!(event = "experiment.cancelled", experiment = %experiment, iteration = iteration);
}

/// Emit event: a request was rejected (warning level).
pub fn emit_request_rejected(operation: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "request.rejected", operation = %operation, error = %error);
}
