//! Error types for the buzzer client.

use thiserror::Error;

use crate::lifecycle::LifecyclePhase;

/// Errors that can occur when using the buzzer client.
///
/// None of these are fatal. The ingestion path returns
/// [`MalformedSnapshot`](BuzzerError::MalformedSnapshot) to the caller and
/// leaves the session untouched; [`DuplicateTransition`](BuzzerError::DuplicateTransition)
/// and [`TimerConflict`](BuzzerError::TimerConflict) are produced internally,
/// logged, and collapsed into no-ops.
#[derive(Debug, Error)]
pub enum BuzzerError {
    /// A snapshot was missing a required field or had the wrong shape.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// The lifecycle has no edge for the current phase and snapshot flags.
    #[error("no lifecycle transition from {phase:?} for {trigger}")]
    DuplicateTransition {
        /// Phase the controller was in.
        phase: LifecyclePhase,
        /// Short description of the trigger that found no edge.
        trigger: &'static str,
    },

    /// A cleanup was requested while one is already pending or done.
    #[error("cleanup timer already scheduled")]
    TimerConflict,

    /// Failed to serialize or deserialize a wire message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Attempted to publish an intent after the client loop stopped.
    #[error("not connected")]
    NotConnected,

    /// The session already emitted `session-closed`.
    #[error("session closed")]
    SessionClosed,
}

/// A specialized [`Result`] type for buzzer client operations.
pub type Result<T> = std::result::Result<T, BuzzerError>;
