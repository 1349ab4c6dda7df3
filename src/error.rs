//! Error types for a3s-signal

use thiserror::Error;

/// Errors that can occur in the event hub
#[derive(Debug, Error)]
pub enum SignalError {
    /// Registration attempted on a disposed container or hub
    #[error("Cannot register callback: {target} is disposed")]
    Disposed { target: String },

    /// A callback reported a failure while handling an event
    #[error("Handler error: {0}")]
    Handler(String),

    /// A callback panicked while handling an event
    #[error("Handler for event type '{event_type}' panicked: {message}")]
    Panicked { event_type: String, message: String },

    /// One or more callbacks failed during a single trigger
    #[error("{} of {total} handlers failed for event type '{event_type}'", .failures.len())]
    Trigger {
        event_type: String,
        total: usize,
        failures: Vec<SignalError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal bookkeeping inconsistency
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignalError {
    /// Build a handler failure from any displayable reason
    pub fn handler(reason: impl std::fmt::Display) -> Self {
        Self::Handler(reason.to_string())
    }

    pub(crate) fn disposed(target: impl Into<String>) -> Self {
        Self::Disposed {
            target: target.into(),
        }
    }

    /// Whether this is the disposed-use error
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }

    /// Individual callback failures carried by an aggregate trigger error
    pub fn failures(&self) -> &[SignalError] {
        match self {
            Self::Trigger { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// Result type alias for event hub operations
pub type Result<T> = std::result::Result<T, SignalError>;
