//! Domain models for AgentLab.
//!
//! - `Agent`: a named profile with role, goal and backstory
//! - `ExperimentRequest`: parameters for one simulated experiment
//! - `LabError` / `ValidationError`: the error taxonomy

pub mod agent;
pub mod error;
pub mod experiment;

pub use agent::{Agent, AgentDraft, AgentId, AgentPatch};
pub use error::{LabError, Result, ValidationError};
pub use experiment::{ExperimentRequest, MAX_ITERATIONS, MIN_ITERATIONS};
