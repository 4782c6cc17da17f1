//! Lab service: the boundary between the view layer and the core.
//!
//! Owns the agent registry and hands out experiment runs. Every request is
//! validated here; failures are reported to the notifier and returned to the
//! caller, and never propagate further.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::config::LabConfig;
use crate::domain::{
    Agent, AgentDraft, AgentId, AgentPatch, ExperimentRequest, LabError, Result, ValidationError,
};
use crate::metrics::METRICS;
use crate::notify::{Notice, Notifier};
use crate::obs;
use crate::registry::AgentRegistry;
use crate::runner::{ExperimentEvent, ExperimentHandle, ExperimentRunner};
use crate::simulator::Simulator;

/// A launched experiment: the cancellation handle plus its event stream.
#[derive(Debug)]
pub struct ExperimentRun {
    pub handle: ExperimentHandle,
    pub events: UnboundedReceiver<ExperimentEvent>,
}

impl ExperimentRun {
    /// Consume events until the run ends, passing each one to `on_event`.
    ///
    /// Returns the terminal event (`Completed` or `Cancelled`), or `None` if
    /// the run never started ticking.
    pub async fn finish<F>(mut self, mut on_event: F) -> Option<ExperimentEvent>
    where
        F: FnMut(&ExperimentEvent),
    {
        let mut last = None;
        while let Some(event) = self.events.recv().await {
            on_event(&event);
            if event.is_terminal() {
                last = Some(event);
            }
        }
        last
    }
}

pub struct LabService {
    registry: AgentRegistry,
    notifier: Arc<dyn Notifier>,
    runner: ExperimentRunner,
    config: LabConfig,
    seeds: ChaCha8Rng,
}

impl std::fmt::Debug for LabService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabService")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LabService {
    pub fn new(config: LabConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_registry(AgentRegistry::new(), config, notifier)
    }

    /// Service over an existing registry (e.g. one with a pinned clock).
    pub fn with_registry(
        registry: AgentRegistry,
        config: LabConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let seeds = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let runner =
            ExperimentRunner::new(config.tick_interval()).with_notifier(Arc::clone(&notifier));
        Self {
            registry,
            notifier,
            runner,
            config,
            seeds,
        }
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn create_agent(&mut self, draft: AgentDraft) -> Result<Agent> {
        match self.registry.create(draft) {
            Ok(agent) => {
                obs::emit_agent_changed("created", &agent.id.to_string(), &agent.name);
                self.notifier.notify(Notice::agent_created(&agent));
                Ok(agent)
            }
            Err(err) => Err(self.reject("create_agent", err)),
        }
    }

    /// Apply `patch` to the agent.
    ///
    /// A patch that names no field is rejected rather than treated as a
    /// no-op, so `updated_at` only moves when a field was submitted.
    pub fn update_agent(&mut self, id: AgentId, patch: AgentPatch) -> Result<Agent> {
        if patch.is_empty() {
            return Err(self.reject("update_agent", ValidationError::EmptyPatch.into()));
        }
        match self.registry.update(id, patch) {
            Ok(agent) => {
                obs::emit_agent_changed("updated", &agent.id.to_string(), &agent.name);
                self.notifier.notify(Notice::agent_updated(&agent));
                Ok(agent)
            }
            Err(err) => Err(self.reject("update_agent", err)),
        }
    }

    pub fn delete_agent(&mut self, id: AgentId) -> Result<Agent> {
        match self.registry.delete(id) {
            Ok(agent) => {
                obs::emit_agent_changed("deleted", &agent.id.to_string(), &agent.name);
                self.notifier.notify(Notice::agent_deleted(&agent));
                Ok(agent)
            }
            Err(err) => Err(self.reject("delete_agent", err)),
        }
    }

    pub fn list_agents(&self) -> Vec<Agent> {
        self.registry.list()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.registry.get(id)
    }

    /// Resolve an agent by id or, failing that, by exact name.
    pub fn resolve(&self, reference: &str) -> Result<AgentId> {
        let found = reference
            .parse::<AgentId>()
            .ok()
            .and_then(|id| self.registry.get(id))
            .or_else(|| self.registry.find_by_name(reference));
        match found {
            Some(agent) => Ok(agent.id),
            None => Err(self.reject(
                "resolve_agent",
                LabError::UnknownAgent(reference.to_string()),
            )),
        }
    }

    /// Validate `request` and start ticking it on a fresh timer task.
    ///
    /// The registry is only read: the run holds a copy of the agent.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_experiment(&mut self, request: ExperimentRequest) -> Result<ExperimentRun> {
        let Some(agent) = self.registry.get(request.agent_id).cloned() else {
            return Err(self.reject("start_experiment", LabError::AgentNotFound(request.agent_id)));
        };

        let mut simulator = Simulator::new(Arc::new(self.config.scoring_strategy()));
        let experiment = request.name.clone();
        let max_iterations = request.max_iterations;
        if let Err(err) = simulator.start(request, &agent) {
            return Err(self.reject("start_experiment", err));
        }

        METRICS.inc_experiments_started();
        obs::emit_experiment_started(&experiment, &agent.name, max_iterations);
        self.notifier
            .notify(Notice::experiment_started(&experiment, &agent));

        let rng = ChaCha8Rng::seed_from_u64(self.seeds.gen());
        let (handle, events) = self.runner.spawn(simulator, rng);
        info!(experiment = %experiment, agent = %agent.name, "experiment launched");
        Ok(ExperimentRun { handle, events })
    }

    fn reject(&self, operation: &str, err: LabError) -> LabError {
        obs::emit_request_rejected(operation, &err);
        self.notifier.notify(Notice::rejected(&err));
        err
    }
}
