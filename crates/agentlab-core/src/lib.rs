//! AgentLab Core Library
//!
//! In-memory agent registry and the simulated multi-candidate experiment
//! runner, plus the service boundary that the CLI drives.

pub mod clock;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod notify;
pub mod obs;
pub mod registry;
pub mod runner;
pub mod service;
pub mod simulator;
pub mod telemetry;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LabConfig, LogConfig, ScoringConfig};
pub use domain::{
    Agent, AgentDraft, AgentId, AgentPatch, ExperimentRequest, LabError, Result, ValidationError,
    MAX_ITERATIONS, MIN_ITERATIONS,
};
pub use metrics::METRICS;
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use registry::AgentRegistry;
pub use runner::{ExperimentEvent, ExperimentHandle, ExperimentRunner};
pub use service::{ExperimentRun, LabService};
pub use simulator::{
    initial_scores, leader, CandidateScore, ExperimentOutcome, ExperimentSnapshot, RandomWalk,
    ScoringStrategy, Simulator, SimulatorState, TickOutcome, CANDIDATES,
};
pub use telemetry::init_tracing;
pub use view::{agent_count_label, chart_rows, progress, winner_line, ChartRow, ProgressView};

/// AgentLab version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
