//! Error types for the adflow crate.
//!
//! Load and show failures are not errors: they complete the operation with
//! [`Outcome::Failed`](crate::Outcome::Failed). The errors here are façade
//! rejections and infrastructure faults.

use adflow_bus::{AdFormat, BusError};

use crate::state::SessionState;

/// Errors returned by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum AdError {
    /// Load or show requested before the SDK finished initializing
    #[error("SDK is not initialized, cannot drive the {0} slot")]
    NotInitialized(AdFormat),

    /// Initialization was already started
    #[error("SDK initialization already started")]
    AlreadyInitialized,

    /// The slot has an operation in flight, or is not in a state that
    /// accepts the request
    #[error("{format} slot is busy ({state})")]
    SlotBusy {
        format: AdFormat,
        state: SessionState,
    },

    /// Show requested without a loaded ad
    #[error("No {0} ad is loaded")]
    NotLoaded(AdFormat),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The orchestrator must be created inside a Tokio runtime
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// The session task ended without reporting an outcome
    #[error("{0} session ended without an outcome")]
    SessionAborted(&'static str),

    /// The orchestrator was shut down
    #[error("Orchestrator is shut down")]
    ShutDown,

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, AdError>;
