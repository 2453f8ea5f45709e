//! # Check Errors
//!
//! Errors surfaced by the check engine. Every variant carries owned strings so
//! the type is `Clone`: a failed task future hands the same error to every
//! caller of `get()`.

use thiserror::Error;

use crate::config::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// A data source call failed or returned malformed data
    #[error("Remote query error: {0}")]
    RemoteQuery(String),

    /// Thresholds or pool settings are missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A task body panicked while running on a worker
    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    /// Waiting on a future exceeded its deadline
    #[error("Timed out after {seconds:.1}s waiting for {operation}")]
    Timeout { operation: String, seconds: f64 },

    /// The pool was shut down before the task could run
    #[error("Worker pool shut down before the task completed")]
    PoolShutDown,

    /// A worker tried to wait on a future belonging to its own pool
    #[error("Worker {worker} attempted to wait on a task from its own pool")]
    SelfBlocking { worker: usize },

    /// Invalid pool lifecycle operation
    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl CheckError {
    pub fn remote_query<S: Into<String>>(message: S) -> Self {
        Self::RemoteQuery(message.into())
    }

    pub fn timeout<S: Into<String>>(operation: S, seconds: f64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Configuration errors stop the run before any pool work starts;
    /// everything else is reported as UNKNOWN.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CheckError::Configuration(_))
    }
}

impl From<ConfigurationError> for CheckError {
    fn from(error: ConfigurationError) -> Self {
        CheckError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
