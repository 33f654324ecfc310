//! Error taxonomy for sessions, transports, protocol decoding and configuration

use thiserror::Error;

/// Failures reported by a [`Transport`](crate::transport::Transport)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The relay refused the request
    #[error("transport rejected the request: {0}")]
    Rejected(String),

    /// `join` was given a code the relay does not know (or no longer knows)
    #[error("unknown or expired session: {0}")]
    UnknownSession(String),

    /// `transmit` or `leave` before `host`/`join` succeeded
    #[error("not connected to a session")]
    NotConnected,

    /// The underlying channel is gone
    #[error("transport closed")]
    Closed,
}

/// Raised when food cannot be placed because snakes cover the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no space available for food after {attempts} attempts ({occupied} of {capacity} cells occupied)")]
pub struct GridExhausted {
    pub attempts: u32,
    pub occupied: usize,
    pub capacity: usize,
}

/// Payload normalization failures at the transport boundary
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message kind: {0}")]
    UnknownKind(String),

    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    #[error("unrecognized payload shape")]
    Unrecognized,

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid {cols}x{rows} is smaller than the {min}x{min} minimum")]
    GridTooSmall { cols: i32, rows: i32, min: i32 },

    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,

    #[error("participant limits are invalid (min {min}, max {max})")]
    ParticipantLimits { min: usize, max: usize },

    #[error("probability {0} is outside [0, 1]")]
    Probability(f64),

    #[error("max placement attempts must be greater than zero")]
    ZeroPlacementAttempts,
}

/// Errors surfaced to callers of the session coordinators
#[derive(Debug, Error)]
pub enum SessionError {
    /// `host()`/`join()` rejected by the transport. Recoverable; the caller
    /// decides whether to retry.
    #[error("connection failure: {0}")]
    ConnectionFailure(#[from] TransportError),

    /// Empty or malformed code given to `join()`; no network call was made
    #[error("invalid session code: {0:?}")]
    InvalidSessionCode(String),

    /// The grid is saturated by snake bodies. Fatal to the session.
    #[error("grid exhausted: {0}")]
    GridExhaustion(#[from] GridExhausted),

    #[error("operation requires phase {expected}, session is {actual}")]
    InvalidPhase {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
