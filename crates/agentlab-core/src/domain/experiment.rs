//! Experiment requests.

use serde::{Deserialize, Serialize};

use super::agent::{require_text, AgentId};
use super::error::ValidationError;

/// Smallest accepted iteration budget.
pub const MIN_ITERATIONS: u32 = 1;

/// Largest accepted iteration budget.
pub const MAX_ITERATIONS: u32 = 100;

/// Parameters for one simulated experiment against an existing agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRequest {
    pub agent_id: AgentId,
    pub name: String,
    pub prompt: String,
    pub max_iterations: u32,
}

impl ExperimentRequest {
    pub fn new(
        agent_id: AgentId,
        name: impl Into<String>,
        prompt: impl Into<String>,
        max_iterations: u32,
    ) -> Self {
        Self {
            agent_id,
            name: name.into(),
            prompt: prompt.into(),
            max_iterations,
        }
    }

    /// Check name, prompt and iteration budget, in that order.
    ///
    /// Does not check that `agent_id` exists; that is the caller's job.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("prompt", &self.prompt)?;
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.max_iterations) {
            return Err(ValidationError::IterationsOutOfRange {
                value: self.max_iterations,
                min: MIN_ITERATIONS,
                max: MAX_ITERATIONS,
            });
        }
        Ok(())
    }
}
