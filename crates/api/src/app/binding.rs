//! CloudEvents HTTP protocol binding.
//!
//! Structured mode is selected by a `application/cloudevents+json` content
//! type; everything else is binary mode (`ce-*` headers, body is the data).
//! Binary-mode `ce-*` header values are percent-encoded UTF-8.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use percent_encoding::percent_decode;

use cloudrelay_events::binding::{
    self, CE_ID, CE_SOURCE, CE_SPECVERSION, CE_SUBJECT, CE_TIME, CE_TYPE, envelope_from_binary,
};
use cloudrelay_events::{Envelope, EnvelopeError, STRUCTURED_CONTENT_TYPE};

const BATCH_CONTENT_TYPE: &str = "application/cloudevents-batch+json";

/// `ce-*` headers read in binary mode, with the attribute each one carries.
const CE_HEADERS: [(&str, &str); 6] = [
    (CE_SPECVERSION, "specversion"),
    (CE_ID, "id"),
    (CE_TYPE, "type"),
    (CE_SOURCE, "source"),
    (CE_TIME, "time"),
    (CE_SUBJECT, "subject"),
];

/// Which binding a request uses, judged from its `content-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    Binary,
    Structured,
    Batched,
}

impl ContentMode {
    pub fn of(headers: &HeaderMap) -> Self {
        let media = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or_default();

        if media.eq_ignore_ascii_case(STRUCTURED_CONTENT_TYPE) {
            Self::Structured
        } else if media.eq_ignore_ascii_case(BATCH_CONTENT_TYPE) {
            Self::Batched
        } else {
            Self::Binary
        }
    }
}

/// Build an envelope from an HTTP request.
pub fn envelope_from_request(headers: &HeaderMap, body: Bytes) -> Result<Envelope, EnvelopeError> {
    match ContentMode::of(headers) {
        ContentMode::Structured => Envelope::from_structured_json(&body),
        ContentMode::Batched => Err(EnvelopeError::Structured(
            "batched content mode is not supported".to_string(),
        )),
        ContentMode::Binary => {
            let metadata = binary_metadata(headers)?;
            let lookup = |key: &str| metadata.get(key).map(String::as_str);
            envelope_from_binary(lookup, body.to_vec())
        }
    }
}

/// Decoded binary-mode metadata keyed by lower-case header name.
///
/// A present header that does not decode to UTF-8 is an error rather than
/// being treated as absent.
fn binary_metadata(headers: &HeaderMap) -> Result<HashMap<&'static str, String>, EnvelopeError> {
    let mut metadata = HashMap::new();

    for (header, attribute) in CE_HEADERS {
        if let Some(value) = headers.get(header) {
            let decoded = percent_decode(value.as_bytes())
                .decode_utf8()
                .map_err(|e| EnvelopeError::InvalidAttribute {
                    attribute,
                    reason: e.to_string(),
                })?;
            metadata.insert(header, decoded.into_owned());
        }
    }

    if let Some(value) = headers.get(CONTENT_TYPE) {
        let content_type = value.to_str().map_err(|e| EnvelopeError::InvalidAttribute {
            attribute: "datacontenttype",
            reason: e.to_string(),
        })?;
        metadata.insert(binding::CONTENT_TYPE, content_type.to_string());
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(*v));
        }
        map
    }

    #[test]
    fn binary_mode_reads_ce_headers() {
        let h = headers(&[
            ("ce-specversion", "1.0"),
            ("ce-id", "42"),
            ("ce-type", "com.google.cloud.pubsub.topic.publish"),
            ("ce-source", "//pubsub.googleapis.com/projects/p/topics/t"),
            ("ce-subject", "messages/42"),
            ("ce-time", "2024-05-01T12:00:00Z"),
            ("content-type", "application/json"),
        ]);

        let env = envelope_from_request(&h, Bytes::from_static(br#"{"data":"fooo"}"#)).unwrap();
        assert_eq!(env.id(), "42");
        assert_eq!(env.subject(), Some("messages/42"));
        assert_eq!(env.content_type(), Some("application/json"));
        assert!(env.time().is_some());
        assert_eq!(env.data(), br#"{"data":"fooo"}"#);
    }

    #[test]
    fn structured_mode_is_selected_by_content_type() {
        let h = headers(&[("content-type", "application/cloudevents+json; charset=utf-8")]);
        assert_eq!(ContentMode::of(&h), ContentMode::Structured);

        let body = br#"{
            "specversion": "1.0",
            "id": "7",
            "type": "google.cloud.audit.log.v1.written",
            "source": "//cloudaudit.googleapis.com",
            "data": {"severity": "ERROR"}
        }"#;
        let env = envelope_from_request(&h, Bytes::from_static(body)).unwrap();
        assert_eq!(env.event_type(), "google.cloud.audit.log.v1.written");
        assert_eq!(env.data(), br#"{"severity":"ERROR"}"#);
    }

    #[test]
    fn missing_specversion_header_is_rejected() {
        let h = headers(&[("ce-id", "1"), ("ce-type", "t"), ("ce-source", "s")]);
        assert_eq!(
            envelope_from_request(&h, Bytes::new()),
            Err(EnvelopeError::MissingAttribute("specversion"))
        );
    }

    #[test]
    fn percent_encoded_headers_are_decoded() {
        let h = headers(&[
            ("ce-specversion", "1.0"),
            ("ce-id", "1"),
            ("ce-type", "com.google.cloud.pubsub.topic.publish"),
            ("ce-source", "//tests/a%20b"),
            ("ce-subject", "caf%C3%A9%20bar"),
        ]);

        let env = envelope_from_request(&h, Bytes::new()).unwrap();
        assert_eq!(env.subject(), Some("café bar"));
        assert_eq!(env.source(), "//tests/a b");
    }

    #[test]
    fn raw_utf8_header_is_kept() {
        let mut h = headers(&[
            ("ce-specversion", "1.0"),
            ("ce-id", "1"),
            ("ce-type", "t"),
            ("ce-source", "s"),
        ]);
        h.insert("ce-subject", HeaderValue::from_bytes("café".as_bytes()).unwrap());

        let env = envelope_from_request(&h, Bytes::new()).unwrap();
        assert_eq!(env.subject(), Some("café"));
    }

    #[test]
    fn undecodable_type_is_invalid_not_missing() {
        let mut h = headers(&[("ce-specversion", "1.0"), ("ce-id", "1"), ("ce-source", "s")]);
        h.insert("ce-type", HeaderValue::from_bytes(b"bad\xff").unwrap());

        assert!(matches!(
            envelope_from_request(&h, Bytes::new()),
            Err(EnvelopeError::InvalidAttribute { attribute: "type", .. })
        ));
    }

    #[test]
    fn percent_encoded_invalid_utf8_is_rejected() {
        let h = headers(&[
            ("ce-specversion", "1.0"),
            ("ce-id", "1"),
            ("ce-type", "t"),
            ("ce-source", "s"),
            ("ce-subject", "caf%C3"),
        ]);

        assert!(matches!(
            envelope_from_request(&h, Bytes::new()),
            Err(EnvelopeError::InvalidAttribute { attribute: "subject", .. })
        ));
    }

    #[test]
    fn batched_mode_is_rejected() {
        let h = headers(&[("content-type", "application/cloudevents-batch+json")]);
        assert!(matches!(
            envelope_from_request(&h, Bytes::from_static(b"[]")),
            Err(EnvelopeError::Structured(_))
        ));
    }
}
