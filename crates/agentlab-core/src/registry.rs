//! In-memory agent registry.
//!
//! An ordered, single-writer collection of [`Agent`] records. Insertion order
//! is display order; updates never move an entry.
//!
//! The registry has no internal locking. Callers that share it across tasks
//! must serialize writes themselves.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::domain::{Agent, AgentDraft, AgentId, AgentPatch, LabError, Result};
use crate::metrics::METRICS;

/// Ordered collection of agents mutated only through create/update/delete.
pub struct AgentRegistry {
    agents: Vec<Agent>,
    clock: Arc<dyn Clock>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents)
            .finish_non_exhaustive()
    }
}

impl AgentRegistry {
    /// Registry stamped by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            agents: Vec::new(),
            clock,
        }
    }

    /// Validate and append a new agent.
    ///
    /// # Errors
    ///
    /// `LabError::Validation` if any field is empty after trimming. The
    /// registry is unchanged in that case.
    pub fn create(&mut self, draft: AgentDraft) -> Result<Agent> {
        draft.validate()?;

        let now = self.clock.now();
        let agent = Agent {
            id: AgentId::new(),
            name: draft.name,
            role: draft.role,
            goal: draft.goal,
            backstory: draft.backstory,
            created_at: now,
            updated_at: now,
        };
        self.agents.push(agent.clone());

        METRICS.inc_agents_created();
        debug!(agent_id = %agent.id, name = %agent.name, "agent created");
        Ok(agent)
    }

    /// Merge `patch` into an existing agent and refresh `updated_at`.
    ///
    /// `id`, `created_at` and position are preserved.
    ///
    /// # Errors
    ///
    /// - `LabError::AgentNotFound` if `id` is absent.
    /// - `LabError::Validation` if the merged agent would have an empty field.
    pub fn update(&mut self, id: AgentId, patch: AgentPatch) -> Result<Agent> {
        let now = self.clock.now();
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(LabError::AgentNotFound(id))?;

        let merged = patch.merged_with(agent);
        merged.validate()?;

        agent.name = merged.name;
        agent.role = merged.role;
        agent.goal = merged.goal;
        agent.backstory = merged.backstory;
        agent.updated_at = next_stamp(agent.updated_at, now);

        METRICS.inc_agents_updated();
        debug!(agent_id = %id, "agent updated");
        Ok(agent.clone())
    }

    /// Remove an agent, keeping the order of the rest.
    ///
    /// # Errors
    ///
    /// `LabError::AgentNotFound` if `id` is absent; the list is unchanged.
    pub fn delete(&mut self, id: AgentId) -> Result<Agent> {
        let index = self
            .agents
            .iter()
            .position(|a| a.id == id)
            .ok_or(LabError::AgentNotFound(id))?;
        let removed = self.agents.remove(index);

        METRICS.inc_agents_deleted();
        debug!(agent_id = %id, "agent deleted");
        Ok(removed)
    }

    /// Snapshot of all agents in insertion order.
    pub fn list(&self) -> Vec<Agent> {
        self.agents.clone()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// First agent whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// `updated_at` must strictly increase even if the clock has not moved.
fn next_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::nanoseconds(1)
    }
}
