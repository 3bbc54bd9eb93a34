//! CloudEvents 1.0 envelope: attributes plus raw data bytes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

/// The only CloudEvents spec version accepted and produced.
pub const SPEC_VERSION: &str = "1.0";

/// Media type of a CloudEvent in structured content mode.
pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A required attribute was absent or empty.
    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),

    #[error("unsupported specversion `{0}` (expected {SPEC_VERSION})")]
    UnsupportedSpecVersion(String),

    /// An attribute was present but could not be parsed.
    #[error("invalid attribute `{attribute}`: {reason}")]
    InvalidAttribute {
        attribute: &'static str,
        reason: String,
    },

    /// A structured-mode document was not a valid CloudEvent.
    #[error("invalid structured event: {0}")]
    Structured(String),
}

/// An immutable CloudEvent.
///
/// The envelope carries the routing attributes plus the raw `data` bytes.
/// Interpretation of `data` depends on `event_type` and is left to the
/// [`DecoderRegistry`](crate::DecoderRegistry).
///
/// Notes:
/// - `id`, `event_type` and `source` are guaranteed non-empty.
/// - Fields are private; an envelope never changes after [`EnvelopeBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    id: String,
    event_type: String,
    source: String,
    spec_version: String,
    content_type: Option<String>,
    subject: Option<String>,
    time: Option<DateTime<Utc>>,
    data: Vec<u8>,
}

impl Envelope {
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn spec_version(&self) -> &str {
        &self.spec_version
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Parse a CloudEvent in structured JSON mode.
    ///
    /// `data` is taken from `data_base64` when present, otherwise from `data`:
    /// JSON content types keep the JSON value (re-serialized), any other
    /// content type expects a string and keeps its UTF-8 bytes.
    pub fn from_structured_json(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let doc: StructuredEvent =
            serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Structured(e.to_string()))?;

        let data = match (doc.data_base64, doc.data) {
            (Some(_), Some(_)) => {
                return Err(EnvelopeError::Structured(
                    "both `data` and `data_base64` are set".to_string(),
                ));
            }
            (Some(encoded), None) => {
                STANDARD
                    .decode(encoded)
                    .map_err(|e| EnvelopeError::InvalidAttribute {
                        attribute: "data_base64",
                        reason: e.to_string(),
                    })?
            }
            (None, Some(JsonValue::String(s))) if !is_json_content_type(doc.datacontenttype.as_deref()) => {
                s.into_bytes()
            }
            (None, Some(value)) => serde_json::to_vec(&value)
                .map_err(|e| EnvelopeError::Structured(e.to_string()))?,
            (None, None) => Vec::new(),
        };

        let mut builder = Envelope::builder()
            .spec_version(doc.specversion)
            .id(doc.id)
            .event_type(doc.event_type)
            .source(doc.source)
            .data(data);
        if let Some(ct) = doc.datacontenttype {
            builder = builder.content_type(ct);
        }
        if let Some(subject) = doc.subject {
            builder = builder.subject(subject);
        }
        if let Some(time) = doc.time {
            builder = builder.time(time);
        }
        builder.build()
    }
}

/// JSON when unset, `application/json`, or any `+json` / `/json` suffix.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let media = ct.split(';').next().unwrap_or_default().trim();
            media.eq_ignore_ascii_case("application/json")
                || media.ends_with("+json")
                || media.ends_with("/json")
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructuredEvent {
    specversion: String,
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    source: String,
    #[serde(default)]
    datacontenttype: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    data_base64: Option<String>,
}

/// Builder for [`Envelope`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct EnvelopeBuilder {
    id: Option<String>,
    event_type: Option<String>,
    source: Option<String>,
    spec_version: Option<String>,
    content_type: Option<String>,
    subject: Option<String>,
    time: Option<DateTime<Utc>>,
    data: Vec<u8>,
}

impl EnvelopeBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Assign a fresh random UUID as the event id.
    pub fn generated_id(self) -> Self {
        self.id(Uuid::new_v4().to_string())
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn spec_version(mut self, spec_version: impl Into<String>) -> Self {
        self.spec_version = Some(spec_version.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn time_now(self) -> Self {
        self.time(Utc::now())
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    pub fn build(self) -> Result<Envelope, EnvelopeError> {
        let spec_version = self.spec_version.unwrap_or_else(|| SPEC_VERSION.to_string());
        if spec_version != SPEC_VERSION {
            return Err(EnvelopeError::UnsupportedSpecVersion(spec_version));
        }

        Ok(Envelope {
            id: required("id", self.id)?,
            event_type: required("type", self.event_type)?,
            source: required("source", self.source)?,
            spec_version,
            content_type: self.content_type.filter(|ct| !ct.is_empty()),
            subject: self.subject,
            time: self.time,
            data: self.data,
        })
    }
}

fn required(attribute: &'static str, value: Option<String>) -> Result<String, EnvelopeError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EnvelopeError::MissingAttribute(attribute)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> EnvelopeBuilder {
        Envelope::builder()
            .id("evt-1")
            .event_type("com.example.thing")
            .source("//tests")
    }

    #[test]
    fn build_defaults_spec_version() {
        let env = minimal().build().unwrap();
        assert_eq!(env.spec_version(), SPEC_VERSION);
        assert!(env.data().is_empty());
        assert_eq!(env.content_type(), None);
    }

    #[test]
    fn build_rejects_empty_type() {
        let err = minimal().event_type("").build().unwrap_err();
        assert_eq!(err, EnvelopeError::MissingAttribute("type"));
    }

    #[test]
    fn build_rejects_missing_id_and_source() {
        let err = Envelope::builder().event_type("t").source("s").build().unwrap_err();
        assert_eq!(err, EnvelopeError::MissingAttribute("id"));

        let err = Envelope::builder().id("1").event_type("t").build().unwrap_err();
        assert_eq!(err, EnvelopeError::MissingAttribute("source"));
    }

    #[test]
    fn build_rejects_other_spec_versions() {
        let err = minimal().spec_version("0.3").build().unwrap_err();
        assert_eq!(err, EnvelopeError::UnsupportedSpecVersion("0.3".to_string()));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = minimal().generated_id().build().unwrap();
        let b = minimal().generated_id().build().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn structured_json_data_is_reserialized() {
        let doc = json!({
            "specversion": "1.0",
            "id": "abc",
            "type": "google.cloud.audit.log.v1.written",
            "source": "//cloudaudit.googleapis.com/projects/p",
            "datacontenttype": "application/json",
            "data": { "severity": "NOTICE" }
        });

        let env = Envelope::from_structured_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(env.event_type(), "google.cloud.audit.log.v1.written");
        let data: JsonValue = serde_json::from_slice(env.data()).unwrap();
        assert_eq!(data, json!({ "severity": "NOTICE" }));
    }

    #[test]
    fn structured_json_base64_data() {
        let doc = json!({
            "specversion": "1.0",
            "id": "abc",
            "type": "t",
            "source": "s",
            "datacontenttype": "application/octet-stream",
            "data_base64": STANDARD.encode([0u8, 159, 146, 150])
        });

        let env = Envelope::from_structured_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(env.data(), &[0u8, 159, 146, 150]);
    }

    #[test]
    fn structured_json_text_data_keeps_string_bytes() {
        let doc = json!({
            "specversion": "1.0",
            "id": "abc",
            "type": "t",
            "source": "s",
            "datacontenttype": "text/plain",
            "data": "hello"
        });

        let env = Envelope::from_structured_json(doc.to_string().as_bytes()).unwrap();
        assert_eq!(env.data(), b"hello");
    }

    #[test]
    fn structured_json_missing_type_is_rejected() {
        let doc = json!({ "specversion": "1.0", "id": "abc", "source": "s" });
        let err = Envelope::from_structured_json(doc.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, EnvelopeError::Structured(_)));
    }

    #[test]
    fn json_content_type_detection() {
        assert!(is_json_content_type(None));
        assert!(is_json_content_type(Some("application/json; charset=utf-8")));
        assert!(is_json_content_type(Some("application/cloudevents+json")));
        assert!(!is_json_content_type(Some("text/plain")));
    }
}
