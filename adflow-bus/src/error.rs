//! Error types for the adflow-bus crate.

use crate::types::Channel;

/// Errors raised by the bus plumbing.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bridge task is gone, so the callback cannot be marshaled
    #[error("Callback bridge closed, dropped {channel} notification")]
    BridgeClosed {
        /// Channel of the dropped notification
        channel: Channel,
    },
}

/// Ways a race can end without a winning notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RaceError {
    /// The cancel token fired before any stream did
    #[error("Wait cancelled before any notification fired")]
    Cancelled,

    /// The race was built over zero streams
    #[error("Wait has no streams to race")]
    Empty,
}

/// Convenience type alias for Results using BusError.
pub type Result<T> = std::result::Result<T, BusError>;
