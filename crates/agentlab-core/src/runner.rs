//! Timer-driven execution of a [`Simulator`].
//!
//! Each run owns one tokio interval and one task. Ticks never overlap: every
//! tick takes the simulator lock, advances it once and publishes the result
//! before releasing the lock. [`ExperimentHandle::cancel`] takes the same lock,
//! so once it returns no tick can mutate scores or publish progress again.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, Instrument};

use crate::metrics::METRICS;
use crate::notify::{Notice, Notifier};
use crate::obs;
use crate::simulator::{
    ExperimentOutcome, ExperimentSnapshot, Simulator, SimulatorState, TickOutcome,
};

/// Published by a running experiment, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExperimentEvent {
    /// One candidate was scored.
    Progress(ExperimentSnapshot),
    /// The run finished; always the last event of a completed run.
    Completed(ExperimentOutcome),
    /// The run was cancelled; always the last event of a cancelled run.
    Cancelled(ExperimentSnapshot),
}

impl ExperimentEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExperimentEvent::Progress(_))
    }
}

/// Spawns experiment timer tasks.
#[derive(Clone)]
pub struct ExperimentRunner {
    tick_interval: Duration,
    notifier: Option<Arc<dyn Notifier>>,
}

impl std::fmt::Debug for ExperimentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentRunner")
            .field("tick_interval", &self.tick_interval)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

impl ExperimentRunner {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            notifier: None,
        }
    }

    /// Send completion and cancellation notices to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Drive an already started simulator on a fresh timer task.
    ///
    /// The first tick fires one full interval after spawning. A simulator that
    /// is not `Running` produces no events and the task exits on its first
    /// tick.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(
        &self,
        simulator: Simulator,
        rng: R,
    ) -> (ExperimentHandle, UnboundedReceiver<ExperimentEvent>)
    where
        R: RngCore + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let experiment = simulator
            .request()
            .map(|r| r.name.clone())
            .unwrap_or_default();
        let agent_name = simulator
            .agent()
            .map(|a| a.name.clone())
            .unwrap_or_default();

        let simulator = Arc::new(Mutex::new(simulator));
        let stop = Arc::new(Notify::new());
        let span = obs::experiment_span(&experiment, &agent_name);

        let task = tokio::spawn(
            run_loop(
                Arc::clone(&simulator),
                Arc::clone(&stop),
                self.tick_interval,
                rng,
                tx,
                self.notifier.clone(),
            )
            .instrument(span),
        );

        let handle = ExperimentHandle {
            simulator,
            stop,
            task: Some(task),
        };
        (handle, rx)
    }
}

/// Owner of one running experiment. Dropping it cancels the run.
pub struct ExperimentHandle {
    simulator: Arc<Mutex<Simulator>>,
    stop: Arc<Notify>,
    task: Option<JoinHandle<SimulatorState>>,
}

impl std::fmt::Debug for ExperimentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ExperimentHandle {
    /// Stop the run. Returns `false` if it had already finished.
    ///
    /// Synchronous: when this returns the simulator is `Cancelled` and no
    /// further tick can mutate it. The timer task is woken and exits after
    /// publishing [`ExperimentEvent::Cancelled`].
    pub fn cancel(&self) -> bool {
        let cancelled = lock(&self.simulator).cancel();
        self.stop.notify_one();
        cancelled
    }

    pub fn state(&self) -> SimulatorState {
        lock(&self.simulator).state()
    }

    pub fn snapshot(&self) -> ExperimentSnapshot {
        lock(&self.simulator).snapshot()
    }

    pub fn outcome(&self) -> Option<ExperimentOutcome> {
        lock(&self.simulator).outcome().cloned()
    }

    /// Whether the timer task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the timer task to exit and return the final state.
    pub async fn wait(mut self) -> SimulatorState {
        if let Some(task) = self.task.take() {
            if let Ok(state) = task.await {
                return state;
            }
        }
        self.state()
    }
}

impl Drop for ExperimentHandle {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.cancel();
        }
    }
}

fn lock(simulator: &Mutex<Simulator>) -> MutexGuard<'_, Simulator> {
    simulator.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_loop<R>(
    simulator: Arc<Mutex<Simulator>>,
    stop: Arc<Notify>,
    tick_interval: Duration,
    mut rng: R,
    tx: UnboundedSender<ExperimentEvent>,
    notifier: Option<Arc<dyn Notifier>>,
) -> SimulatorState
where
    R: RngCore + Send + 'static,
{
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = stop.notified() => {}
            _ = interval.tick() => {}
        }

        if let Some(state) = step(&simulator, &mut rng, &tx, notifier.as_deref()) {
            return state;
        }
    }
}

/// Advance the simulator once and publish the result under its lock.
///
/// Returns the final state once the run is over. Receivers may be gone (view
/// dismissed), so sends are best-effort.
fn step<R: RngCore>(
    simulator: &Mutex<Simulator>,
    rng: &mut R,
    tx: &UnboundedSender<ExperimentEvent>,
    notifier: Option<&dyn Notifier>,
) -> Option<SimulatorState> {
    let mut sim = lock(simulator);
    match sim.tick(rng) {
        TickOutcome::Progress(snapshot) => {
            let _ = tx.send(ExperimentEvent::Progress(snapshot));
            None
        }
        TickOutcome::Completed(outcome) => {
            METRICS.inc_experiments_completed();
            obs::emit_experiment_completed(
                &outcome.experiment,
                &outcome.winner,
                outcome.winner_score,
                outcome.snapshot.current_iteration,
            );
            if let Some(notifier) = notifier {
                notifier.notify(Notice::experiment_complete(&outcome));
            }
            let _ = tx.send(ExperimentEvent::Completed(outcome));
            Some(SimulatorState::Complete)
        }
        TickOutcome::Halted(SimulatorState::Cancelled) => {
            let snapshot = sim.snapshot();
            let experiment = sim.request().map(|r| r.name.clone()).unwrap_or_default();
            METRICS.inc_experiments_cancelled();
            obs::emit_experiment_cancelled(&experiment, snapshot.current_iteration);
            if let Some(notifier) = notifier {
                notifier.notify(Notice::experiment_cancelled(&experiment));
            }
            let _ = tx.send(ExperimentEvent::Cancelled(snapshot));
            Some(SimulatorState::Cancelled)
        }
        TickOutcome::Halted(state) => {
            debug!(?state, "simulator not running, timer stopped");
            Some(state)
        }
    }
}
