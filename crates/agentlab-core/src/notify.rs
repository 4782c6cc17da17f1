//! User-facing notices.
//!
//! Short-lived success/error messages keyed by outcome. Delivery is
//! fire-and-forget: a notifier never reports failure back to the caller.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::domain::{Agent, LabError};
use crate::simulator::ExperimentOutcome;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One notice shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn agent_created(agent: &Agent) -> Self {
        Self::success(
            "Agent Created",
            format!("{} has been successfully created!", agent.name),
        )
    }

    pub fn agent_updated(agent: &Agent) -> Self {
        Self::success(
            "Agent Updated",
            format!("{} has been successfully updated!", agent.name),
        )
    }

    pub fn agent_deleted(agent: &Agent) -> Self {
        Self::success(
            "Agent Deleted",
            format!("{} has been permanently deleted.", agent.name),
        )
    }

    pub fn experiment_started(experiment: &str, agent: &Agent) -> Self {
        Self::success(
            "Experiment Started",
            format!("Starting \"{}\" with {}...", experiment, agent.name),
        )
    }

    pub fn experiment_complete(outcome: &ExperimentOutcome) -> Self {
        Self::success(
            "Experiment Complete",
            format!(
                "\"{}\" finished: {} performed best for {}.",
                outcome.experiment, outcome.winner, outcome.agent_name
            ),
        )
    }

    pub fn experiment_cancelled(experiment: &str) -> Self {
        Self::success(
            "Experiment Cancelled",
            format!("\"{}\" was stopped before completion.", experiment),
        )
    }

    /// Error notice for a rejected request.
    pub fn rejected(err: &LabError) -> Self {
        match err {
            LabError::Validation(inner) => Self::error(
                "Missing Information",
                format!("Please check the {} field: {}.", inner.field(), inner),
            ),
            LabError::AgentNotFound(id) => {
                Self::error("Agent Not Found", format!("No agent with id {}.", id))
            }
            LabError::UnknownAgent(reference) => Self::error(
                "Agent Not Found",
                format!("No agent matches {}.", reference),
            ),
            LabError::AlreadyRunning => Self::error(
                "Experiment In Progress",
                "Wait for the current experiment to finish or cancel it.",
            ),
            other => Self::error("Something Went Wrong", other.to_string()),
        }
    }
}

/// Receives notices; implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => {
                tracing::info!(title = %notice.title, "{}", notice.description)
            }
            NoticeLevel::Error => {
                tracing::warn!(title = %notice.title, "{}", notice.description)
            }
        }
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        let notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        notices.to_vec()
    }

    /// Remove and return everything received so far.
    pub fn drain(&self) -> Vec<Notice> {
        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *notices)
    }

    pub fn titles(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.title).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        let mut notices = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        notices.push(notice);
    }
}
