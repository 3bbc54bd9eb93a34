//! Dispatch error model.

use thiserror::Error;

/// Boxed error produced by a payload decode function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to resolve, decode, or register an event type.
///
/// All variants are returned to the immediate caller; nothing in this crate
/// retries or swallows them.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No decoder is registered for the envelope's type.
    #[error("unknown event type `{event_type}`")]
    UnknownEventType { event_type: String },

    /// A decoder exists but the payload bytes do not match its shape.
    #[error("malformed `{event_type}` payload: {cause}")]
    MalformedPayload {
        event_type: String,
        #[source]
        cause: BoxError,
    },

    /// A decoder for this type is already registered.
    #[error("decoder for `{event_type}` is already registered")]
    DuplicateType { event_type: String },
}

impl DispatchError {
    pub fn unknown(event_type: impl Into<String>) -> Self {
        Self::UnknownEventType {
            event_type: event_type.into(),
        }
    }

    pub fn malformed(event_type: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::MalformedPayload {
            event_type: event_type.into(),
            cause: cause.into(),
        }
    }

    pub fn duplicate(event_type: impl Into<String>) -> Self {
        Self::DuplicateType {
            event_type: event_type.into(),
        }
    }

    /// The event type the error refers to.
    pub fn event_type(&self) -> &str {
        match self {
            Self::UnknownEventType { event_type }
            | Self::MalformedPayload { event_type, .. }
            | Self::DuplicateType { event_type } => event_type,
        }
    }
}
