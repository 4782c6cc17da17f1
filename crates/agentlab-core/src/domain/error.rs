//! Domain-level error taxonomy for AgentLab.

use super::agent::AgentId;

/// Errors produced by request validation.
///
/// Validation failures never change state: the registry is left untouched and
/// a simulator stays in whatever state it was in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("max_iterations must be between {min} and {max}, got {value}")]
    IterationsOutOfRange { value: u32, min: u32, max: u32 },

    #[error("update names no field to change")]
    EmptyPatch,
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyField { field } => field,
            ValidationError::IterationsOutOfRange { .. } => "max_iterations",
            ValidationError::EmptyPatch => "patch",
        }
    }
}

/// AgentLab errors.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("no agent matches {0:?}")]
    UnknownAgent(String),

    #[error("an experiment is already running")]
    AlreadyRunning,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LabError {
    /// Whether this error is a user-facing validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, LabError::Validation(_))
    }

    /// Whether this error refers to an unknown agent id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LabError::AgentNotFound(_) | LabError::UnknownAgent(_))
    }

    /// Stable machine-readable tag, used in CLI responses.
    pub fn kind(&self) -> &'static str {
        match self {
            LabError::Validation(_) => "validation",
            LabError::AgentNotFound(_) | LabError::UnknownAgent(_) => "not_found",
            LabError::AlreadyRunning => "already_running",
            LabError::Config(_) => "config",
            LabError::Io(_) => "io",
        }
    }
}

/// Result type for AgentLab operations.
pub type Result<T> = std::result::Result<T, LabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::EmptyField { field: "role" };
        assert_eq!(err.field(), "role");
        assert!(err.to_string().contains("role"));

        let err = ValidationError::IterationsOutOfRange {
            value: 0,
            min: 1,
            max: 100,
        };
        assert_eq!(err.field(), "max_iterations");
        assert!(err.to_string().contains("got 0"));
    }

    #[test]
    fn test_lab_error_display() {
        let id = AgentId::new();
        let err = LabError::AgentNotFound(id);
        assert!(err.to_string().contains("agent not found"));
        assert!(err.to_string().contains(&id.to_string()));
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_converts_into_lab_error() {
        let err: LabError = ValidationError::EmptyField { field: "name" }.into();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("validation error"));
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_unknown_agent_kind_is_not_found() {
        let err = LabError::UnknownAgent("Ghost".to_string());
        assert_eq!(err.kind(), "not_found");
        assert_eq!(LabError::AlreadyRunning.kind(), "already_running");
    }
}
