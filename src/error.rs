//! Error types for the module deployer.
//!

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployerError {
    /// A required workflow header or configuration value is missing or invalid
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Launching an application from a bundle failed
    #[error("Submission error: {0}")]
    SubmissionError(String),
    #[error("Partition operation '{operation}' failed for cluster {cluster_id} in application {application_id}: {reason}")]
    PartitionOpError {
        operation: String,
        application_id: String,
        cluster_id: String,
        reason: String,
    },
    /// A cached service session could not be established
    #[error("Session init error for key {key}: {reason}")]
    SessionInitError { key: String, reason: String },
    /// An instance name does not follow the `<kind>:<group>:<label>` convention
    #[error("Invalid name: {0}")]
    InvalidNameError(String),
    #[error("Cluster service error: {0}")]
    ClusterServiceError(String),
    #[error("Engine error: {0}")]
    EngineError(String),
    #[error("State machine error: {0}")]
    StateMachineError(String),
}

impl DeployerError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::SubmissionError(msg.into())
    }

    pub fn cluster_service(msg: impl Into<String>) -> Self {
        Self::ClusterServiceError(msg.into())
    }

    pub fn partition_op(
        operation: impl Into<String>,
        application_id: impl Into<String>,
        cluster_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PartitionOpError {
            operation: operation.into(),
            application_id: application_id.into(),
            cluster_id: cluster_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<::config::ConfigError> for DeployerError {
    fn from(err: ::config::ConfigError) -> Self {
        DeployerError::ConfigurationError(err.to_string())
    }
}

pub type DeployerResult<T> = Result<T, DeployerError>;
