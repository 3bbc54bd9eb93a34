//! `cloudrelay-events`: CloudEvents envelopes and typed payload dispatch.
//!
//! This crate contains the transport-independent core:
//! - [`Envelope`]: an immutable CloudEvent (attributes + raw data bytes)
//! - [`DecoderRegistry`]: type string → payload decoder
//! - [`Dispatcher`]: decode an envelope and hand the payload to a handler
//! - [`EventSender`] / [`EventSource`]: the contracts transports implement
//!
//! No network IO lives here; see `cloudrelay-infra` and `cloudrelay-api`.

pub mod binding;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod in_memory;
pub mod payload;
pub mod publish;
pub mod registry;
pub mod sink;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use envelope::{Envelope, EnvelopeBuilder, EnvelopeError, SPEC_VERSION, STRUCTURED_CONTENT_TYPE};
pub use error::{BoxError, DispatchError};
pub use in_memory::InMemoryTransport;
pub use payload::{
    AUDIT_LOG_WRITTEN, DecodedPayload, LogEntry, MESSAGE_PUBLISHED, MessagePublishedData,
    PUBSUB_PUBLISH, PublishedMessage, PubsubMessage,
};
pub use publish::{PUBLISH_SOURCE, publish_envelope};
pub use registry::{DecodeFn, DecoderEntry, DecoderRegistry};
pub use sink::log_payload;
pub use transport::{Delivery, DeliveryContext, EventSender, EventSource, Receipt, TransportError};
