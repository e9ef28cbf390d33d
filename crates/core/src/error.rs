//! Core error model.

use thiserror::Error;

/// Error raised when parsing the gateway's shared primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier was empty or otherwise unusable.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A downstream service name is not one of the fixed identifiers.
    #[error("unknown downstream service '{0}'")]
    UnknownService(String),
}

impl CoreError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
