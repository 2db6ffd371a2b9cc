use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the AgentPulse runtime.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("session overloaded: {0}")]
    SessionOverloaded(Uuid),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
