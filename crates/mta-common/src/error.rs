//! Centralized error taxonomy for the MTA protocol stack.
//!
//! Every crate defines its own focused error enum; this module provides the
//! umbrella [`MtaError`] that those fold into via `#[from]`, so a driver that
//! doesn't care which layer failed can work with one type end to end.

use thiserror::Error;

/// Top-level error type spanning wire parsing, crypto, discovery, session
/// logic, and transport I/O.
#[derive(Debug, Error)]
pub enum MtaError {
    #[error("malformed wire message: {0}")]
    WireFormat(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("transfer refused by user: {reason}")]
    UserRefuse { reason: String },

    #[error("timed out waiting for {stage}")]
    Timeout { stage: String },
}

impl MtaError {
    pub fn wire(msg: impl Into<String>) -> Self {
        Self::WireFormat(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn timeout(stage: impl Into<String>) -> Self {
        Self::Timeout { stage: stage.into() }
    }

    /// True for errors that a driver can safely retry the current stage on.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }
}

/// Convenience alias for results using [`MtaError`].
pub type MtaResult<T> = Result<T, MtaError>;
