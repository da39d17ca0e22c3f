use crate::error::DeployerError;
use thiserror::Error;

/// Errors raised by the workflow engine itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Event {event} is not accepted in state {state}")]
    EventNotAccepted { state: String, event: String },

    #[error("Action '{action}' failed in state {state}: {reason}")]
    ActionFailed {
        action: String,
        state: String,
        reason: String,
    },

    #[error("Workflow engine for {app_type} is not running")]
    EngineStopped { app_type: String },
}

/// Errors raised by state actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Required header '{header}' is missing")]
    MissingHeader { header: String },

    #[error("Cluster operation failed: {0}")]
    Cluster(#[from] DeployerError),
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type ActionResult<T> = Result<T, ActionError>;

pub fn missing_header(header: &str) -> ActionError {
    ActionError::MissingHeader {
        header: header.to_string(),
    }
}

impl From<StateMachineError> for DeployerError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::EngineStopped { .. } => DeployerError::EngineError(err.to_string()),
            other => DeployerError::StateMachineError(other.to_string()),
        }
    }
}

impl From<ActionError> for DeployerError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::MissingHeader { .. } => DeployerError::ConfigurationError(err.to_string()),
            ActionError::Cluster(inner) => inner,
        }
    }
}
