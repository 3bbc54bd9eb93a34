//! Pub/Sub REST wire types and the CloudEvents ↔ Pub/Sub message mapping.
//!
//! Envelopes travel in binary content mode: the message `data` is the event
//! data and the CloudEvent attributes are message attributes (`ce-id`,
//! `ce-type`, ...).

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cloudrelay_events::binding::{binary_attributes, envelope_from_binary};
use cloudrelay_events::{Delivery, DeliveryContext, Envelope, EnvelopeError};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Base64-encoded payload.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ordering_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    #[serde(default)]
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub max_messages: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    #[serde(default)]
    pub received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub ack_id: String,
    #[serde(default)]
    pub message: WireMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_attempt: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    pub ack_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyAckDeadlineRequest {
    pub ack_ids: Vec<String>,
    pub ack_deadline_seconds: u32,
}

/// Encode an envelope as a binary-mode Pub/Sub message.
pub fn to_wire(envelope: &Envelope) -> WireMessage {
    WireMessage {
        data: STANDARD.encode(envelope.data()),
        attributes: binary_attributes(envelope)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        ..WireMessage::default()
    }
}

/// Decode a pulled message into a [`Delivery`].
///
/// Attribute names are matched case-insensitively (some publishers send
/// `Content-Type`).
pub fn from_wire(received: &ReceivedMessage, subscription: &str) -> Result<Delivery, EnvelopeError> {
    let message = &received.message;
    let data = STANDARD
        .decode(&message.data)
        .map_err(|e| EnvelopeError::InvalidAttribute {
            attribute: "data",
            reason: e.to_string(),
        })?;

    let attributes = &message.attributes;
    let lookup = |key: &str| {
        attributes.get(key).map(String::as_str).or_else(|| {
            attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    };
    let envelope = envelope_from_binary(lookup, data)?;

    let context = DeliveryContext {
        ack_id: received.ack_id.clone(),
        message_id: Some(message.message_id.clone()).filter(|id| !id.is_empty()),
        publish_time: message.publish_time,
        delivery_attempt: received.delivery_attempt,
        subscription: Some(subscription.to_string()),
    };

    Ok(Delivery::new(envelope, context))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use cloudrelay_events::publish_envelope;

    #[test]
    fn publish_request_wire_shape() {
        let env = Envelope::builder()
            .id("id-1")
            .event_type("com.google.cloud.pubsub.topic.publish")
            .source("//tests")
            .content_type("application/json")
            .data(br#"{"data":"fooo"}"#.to_vec())
            .build()
            .unwrap();

        let body = serde_json::to_value(PublishRequest {
            messages: vec![to_wire(&env)],
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "messages": [{
                    "data": STANDARD.encode(br#"{"data":"fooo"}"#),
                    "attributes": {
                        "ce-specversion": "1.0",
                        "ce-id": "id-1",
                        "ce-type": "com.google.cloud.pubsub.topic.publish",
                        "ce-source": "//tests",
                        "content-type": "application/json"
                    }
                }]
            })
        );
    }

    #[test]
    fn pulled_message_becomes_delivery() {
        let env = publish_envelope("fooo").unwrap();
        let mut message = to_wire(&env);
        message.message_id = "998".to_string();

        let received = ReceivedMessage {
            ack_id: "ack-1".to_string(),
            message,
            delivery_attempt: Some(3),
        };

        let delivery = from_wire(&received, "projects/p/subscriptions/s").unwrap();
        assert_eq!(delivery.envelope(), &env);
        assert_eq!(delivery.ack_id(), "ack-1");
        assert_eq!(delivery.context().message_id.as_deref(), Some("998"));
        assert_eq!(delivery.context().delivery_attempt, Some(3));
        assert_eq!(
            delivery.context().subscription.as_deref(),
            Some("projects/p/subscriptions/s")
        );
    }

    #[test]
    fn attribute_names_are_case_insensitive() {
        let received: ReceivedMessage = serde_json::from_value(json!({
            "ackId": "a",
            "message": {
                "data": STANDARD.encode(b"{}"),
                "attributes": {
                    "ce-specversion": "1.0",
                    "ce-id": "1",
                    "ce-type": "t",
                    "ce-source": "s",
                    "Content-Type": "application/json"
                },
                "messageId": "5",
                "publishTime": "2024-05-01T12:00:00.5Z"
            }
        }))
        .unwrap();

        let delivery = from_wire(&received, "sub").unwrap();
        assert_eq!(delivery.envelope().content_type(), Some("application/json"));
        assert!(delivery.context().publish_time.is_some());
    }

    #[test]
    fn plain_pubsub_message_is_not_an_envelope() {
        let received: ReceivedMessage = serde_json::from_value(json!({
            "ackId": "a",
            "message": { "data": STANDARD.encode(b"hello"), "messageId": "5" }
        }))
        .unwrap();

        let err = from_wire(&received, "sub").unwrap_err();
        assert_eq!(err, EnvelopeError::MissingAttribute("specversion"));
    }

    #[test]
    fn invalid_base64_data_is_rejected() {
        let mut message = to_wire(&publish_envelope("x").unwrap());
        message.data = "not base64!".to_string();
        let received = ReceivedMessage {
            ack_id: "a".to_string(),
            message,
            delivery_attempt: None,
        };

        assert!(matches!(
            from_wire(&received, "sub"),
            Err(EnvelopeError::InvalidAttribute { attribute: "data", .. })
        ));
    }
}
