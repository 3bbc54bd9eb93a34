//! Typed payloads for the event types this crate understands.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Eventarc event emitted when a message is published to a Pub/Sub topic.
pub const MESSAGE_PUBLISHED: &str = "google.cloud.pubsub.topic.v1.messagePublished";

/// A raw Pub/Sub message published as a CloudEvent.
pub const PUBSUB_PUBLISH: &str = "com.google.cloud.pubsub.topic.publish";

/// Eventarc event emitted when a Cloud Audit Log entry is written.
pub const AUDIT_LOG_WRITTEN: &str = "google.cloud.audit.log.v1.written";

/// The result of a successful decode; exactly one variant per event.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    MessagePublished(MessagePublishedData),
    PubsubMessage(PubsubMessage),
    AuditLog(LogEntry),
}

impl DecodedPayload {
    /// Short, stable name of the variant (for logs).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessagePublished(_) => "message_published",
            Self::PubsubMessage(_) => "pubsub_message",
            Self::AuditLog(_) => "audit_log",
        }
    }
}

/// Data of a `messagePublished` event: the delivered message and the
/// subscription it arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePublishedData {
    #[serde(default)]
    pub message: PublishedMessage,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subscription: String,
}

/// A Pub/Sub message as embedded in `messagePublished`; `data` is base64 on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedMessage {
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ordering_key: String,
}

/// A Pub/Sub message record whose `data` is carried verbatim as text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    #[serde(default)]
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

impl PubsubMessage {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }
}

/// A Cloud Logging entry.
///
/// Only `severity` is interpreted. Every other attribute (`logName`,
/// `protoPayload`, `resource`, ...) is kept untouched in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(flatten)]
    pub attributes: Map<String, JsonValue>,
}

impl LogEntry {
    pub fn log_name(&self) -> Option<&str> {
        self.str_attribute("logName")
    }

    pub fn insert_id(&self) -> Option<&str> {
        self.str_attribute("insertId")
    }

    /// `protoPayload.methodName` for audit entries.
    pub fn method_name(&self) -> Option<&str> {
        self.attributes
            .get("protoPayload")
            .and_then(|p| p.get("methodName"))
            .and_then(JsonValue::as_str)
    }

    fn str_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(JsonValue::as_str)
    }
}

fn default_severity() -> String {
    "DEFAULT".to_string()
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(s) => STANDARD.decode(s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
