//! Outbound envelope construction for publish mode.

use crate::envelope::{Envelope, EnvelopeError};
use crate::payload::{PUBSUB_PUBLISH, PubsubMessage};

/// `source` attribute stamped on envelopes this process publishes.
pub const PUBLISH_SOURCE: &str = "//cloudrelay/pubsub/sender";

/// Wrap `message` as `{"data": "<message>"}` in a fresh
/// `com.google.cloud.pubsub.topic.publish` envelope (new id, current time).
pub fn publish_envelope(message: impl Into<String>) -> Result<Envelope, EnvelopeError> {
    let data = serde_json::to_vec(&PubsubMessage::new(message)).map_err(|e| {
        EnvelopeError::InvalidAttribute {
            attribute: "data",
            reason: e.to_string(),
        }
    })?;

    Envelope::builder()
        .generated_id()
        .event_type(PUBSUB_PUBLISH)
        .source(PUBLISH_SOURCE)
        .content_type("application/json")
        .time_now()
        .data(data)
        .build()
}
