//! Transport contracts (mechanics only).
//!
//! A transport moves envelopes between this process and some messaging
//! infrastructure. This module defines the two capabilities the rest of the
//! workspace consumes:
//!
//! - [`EventSource`]: hand me envelopes, and let me settle each delivery
//! - [`EventSender`]: take this envelope and deliver it elsewhere
//!
//! ## Delivery semantics
//!
//! Transports are assumed to be **at-least-once**:
//! - a delivery that is nacked (or never settled) will be offered again
//! - the same envelope id may therefore be seen more than once
//! - redelivery timing, dead-lettering and ordering belong to the broker
//!
//! Nothing here retries. A receive loop reports the outcome of each delivery
//! via `ack`/`nack` and moves on.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::envelope::{Envelope, EnvelopeError};

#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker did not accept the envelope.
    #[error("envelope was not delivered: {0}")]
    Undelivered(String),

    /// An envelope could not be mapped to or from the transport's wire format.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,

    /// Any other failure talking to the backend.
    #[error("transport backend error: {0}")]
    Backend(String),
}

/// Broker acknowledgement of a sent envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    message_id: String,
}

impl Receipt {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }

    /// Broker-assigned message id.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

/// Transport-side metadata about one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryContext {
    /// Opaque handle used to ack/nack this delivery.
    pub ack_id: String,
    /// Broker message id (not the CloudEvent id).
    pub message_id: Option<String>,
    pub publish_time: Option<DateTime<Utc>>,
    /// 1 on first delivery, when the broker reports it.
    pub delivery_attempt: Option<u32>,
    /// Subscription (or equivalent) the delivery arrived on.
    pub subscription: Option<String>,
}

/// An envelope received from a transport, awaiting settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    envelope: Envelope,
    context: DeliveryContext,
}

impl Delivery {
    pub fn new(envelope: Envelope, context: DeliveryContext) -> Self {
        Self { envelope, context }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn context(&self) -> &DeliveryContext {
        &self.context
    }

    pub fn ack_id(&self) -> &str {
        &self.context.ack_id
    }
}

/// Send side of a transport.
///
/// `send` returns once the broker acknowledged the envelope (a [`Receipt`])
/// or definitively failed. Implementations must be safe to share across tasks.
#[async_trait]
pub trait EventSender: Send + Sync {
    async fn send(&self, envelope: &Envelope) -> Result<Receipt, TransportError>;
}

/// Receive side of a transport.
///
/// ## Usage Pattern
///
/// ```ignore
/// loop {
///     for delivery in source.receive().await? {
///         match dispatcher.dispatch(delivery.envelope(), handler) {
///             Ok(_) => source.ack(&delivery).await?,
///             Err(_) => source.nack(&delivery).await?,
///         }
///     }
/// }
/// ```
///
/// `receive` may return an empty batch (e.g. a pull timed out); callers just
/// poll again. [`TransportError::Closed`] ends the loop.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn receive(&self) -> Result<Vec<Delivery>, TransportError>;

    /// Processing succeeded; the broker may forget this delivery.
    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError>;

    /// Processing failed; the broker should redeliver per its own policy.
    async fn nack(&self, delivery: &Delivery) -> Result<(), TransportError>;
}

#[async_trait]
impl<T> EventSender for Arc<T>
where
    T: EventSender + ?Sized,
{
    async fn send(&self, envelope: &Envelope) -> Result<Receipt, TransportError> {
        (**self).send(envelope).await
    }
}

#[async_trait]
impl<T> EventSource for Arc<T>
where
    T: EventSource + ?Sized,
{
    async fn receive(&self) -> Result<Vec<Delivery>, TransportError> {
        (**self).receive().await
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        (**self).ack(delivery).await
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        (**self).nack(delivery).await
    }
}
