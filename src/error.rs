//! Error types for a snapmover run
//!
//! Every variant here ends the run. Failures that only cost one transfer job
//! are logged by the batch dispatcher and never become an `Error` unless the
//! abort policy is selected.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using the run error
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error for a snapmover run
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Cluster access or resource error outside of a wait step
    #[error(transparent)]
    Cluster(#[from] snapmover_common::Error),

    /// Missing or malformed input
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The top-level Backup could not be created
    #[error("failed to create backup {name}: {source}")]
    RequestCreate {
        /// Generated backup name
        name: String,
        /// Underlying cluster error
        source: snapmover_common::Error,
    },

    /// A transfer job could not be created and the abort policy is active
    #[error("failed to create transfer job for {item}: {source}")]
    ItemCreate {
        /// Content the job was meant to move
        item: String,
        /// Underlying cluster error
        source: snapmover_common::Error,
    },

    /// A wait step ran out of time
    #[error("timed out after {timeout:?} waiting for {phase}")]
    PhaseTimeout {
        /// What was being waited on
        phase: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// A wait step hit a non-retryable error
    #[error("failed waiting for {phase}: {source}")]
    PhaseFailed {
        /// What was being waited on
        phase: String,
        /// Underlying cluster error
        source: snapmover_common::Error,
    },

    /// The orchestrator was asked to skip or repeat a phase
    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition {
        /// Phase the run was in
        from: String,
        /// Phase that was requested
        to: String,
    },
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from a wait step running out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PhaseTimeout { .. })
    }
}
