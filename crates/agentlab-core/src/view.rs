//! Display models handed to the view layer.

use serde::{Deserialize, Serialize};

use crate::simulator::{ExperimentOutcome, ExperimentSnapshot};

/// One bar of the score chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartRow {
    pub name: String,
    /// Score rounded to the nearest integer.
    pub score: i64,
    pub attempts: u32,
}

/// Iteration progress, e.g. `7/10 (70%)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressView {
    pub current: u32,
    pub max: u32,
    pub percent: u32,
}

impl std::fmt::Display for ProgressView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({}%)", self.current, self.max, self.percent)
    }
}

pub fn chart_rows(snapshot: &ExperimentSnapshot) -> Vec<ChartRow> {
    snapshot
        .scores
        .iter()
        .map(|c| ChartRow {
            name: c.name.clone(),
            score: c.score.round() as i64,
            attempts: c.attempts,
        })
        .collect()
}

pub fn progress(snapshot: &ExperimentSnapshot) -> ProgressView {
    let percent = if snapshot.max_iterations == 0 {
        0
    } else {
        (f64::from(snapshot.current_iteration) / f64::from(snapshot.max_iterations) * 100.0)
            .round() as u32
    };
    ProgressView {
        current: snapshot.current_iteration,
        max: snapshot.max_iterations,
        percent,
    }
}

/// "Winner: Gemini (final score 37)".
pub fn winner_line(outcome: &ExperimentOutcome) -> String {
    format!(
        "Winner: {} (final score {})",
        outcome.winner,
        outcome.winner_score.round() as i64
    )
}

/// Badge text for the agent count.
pub fn agent_count_label(count: usize) -> String {
    if count == 1 {
        "1 Agent".to_string()
    } else {
        format!("{} Agents", count)
    }
}
