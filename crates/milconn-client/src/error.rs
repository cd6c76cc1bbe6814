use std::time::Duration;

use milconn_transport::TransportError;
use milconn_value::{Address, ValueError, VarKind};

/// Errors surfaced by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No session, session lost, or connect timed out / was aborted.
    #[error("connection error: {0}")]
    Connection(String),

    /// The transport explicitly rejected a write.
    #[error("failed to send {kind} value to address {address}")]
    Send { kind: VarKind, address: Address },

    /// No response arrived in time.
    #[error("timed out after {timeout:?} waiting for {kind} value at address {address}")]
    Timeout {
        kind: VarKind,
        address: Address,
        timeout: Duration,
    },

    /// Unclassified failure reported by the transport.
    #[error("api error: {0}")]
    Api(String),

    /// Caller-supplied value rejected before any native call.
    #[error("invalid value: {0}")]
    Validation(#[from] ValueError),

    /// Native boundary error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Coarse error taxonomy front ends switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Connection,
    Send,
    Api,
    Validation,
}

impl ClientError {
    pub(crate) fn not_connected() -> Self {
        ClientError::Connection("not connected".to_string())
    }

    /// Taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Connection(_) => ErrorClass::Connection,
            ClientError::Send { .. } => ErrorClass::Send,
            ClientError::Timeout { .. } | ClientError::Api(_) => ErrorClass::Api,
            ClientError::Validation(_) => ErrorClass::Validation,
            ClientError::Transport(TransportError::InvalidHost { .. }) => ErrorClass::Validation,
            ClientError::Transport(TransportError::CreateFailed) => ErrorClass::Api,
        }
    }

    /// Whether this is a response timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
