//! CloudEvents binary content mode.
//!
//! In binary mode the event attributes travel as transport metadata
//! (`ce-id`, `ce-type`, ... HTTP headers or Pub/Sub message attributes) and
//! the event data is the raw message body. Both the HTTP receiver and the
//! Pub/Sub transport use these helpers so the attribute names stay in one place.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::envelope::{Envelope, EnvelopeError};

pub const CE_SPECVERSION: &str = "ce-specversion";
pub const CE_ID: &str = "ce-id";
pub const CE_TYPE: &str = "ce-type";
pub const CE_SOURCE: &str = "ce-source";
pub const CE_TIME: &str = "ce-time";
pub const CE_SUBJECT: &str = "ce-subject";
pub const CONTENT_TYPE: &str = "content-type";

/// Build an envelope from binary-mode metadata.
///
/// `lookup` returns the value of a metadata key (lower-case names are
/// passed); case folding, if the transport needs it, is up to the caller.
pub fn envelope_from_binary<'a, F>(lookup: F, data: Vec<u8>) -> Result<Envelope, EnvelopeError>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let spec_version = lookup(CE_SPECVERSION).ok_or(EnvelopeError::MissingAttribute("specversion"))?;

    let mut builder = Envelope::builder()
        .spec_version(spec_version)
        .id(lookup(CE_ID).unwrap_or_default())
        .event_type(lookup(CE_TYPE).unwrap_or_default())
        .source(lookup(CE_SOURCE).unwrap_or_default())
        .data(data);

    if let Some(ct) = lookup(CONTENT_TYPE) {
        builder = builder.content_type(ct);
    }
    if let Some(subject) = lookup(CE_SUBJECT) {
        builder = builder.subject(subject);
    }
    if let Some(raw) = lookup(CE_TIME) {
        let time = DateTime::parse_from_rfc3339(raw).map_err(|e| EnvelopeError::InvalidAttribute {
            attribute: "time",
            reason: e.to_string(),
        })?;
        builder = builder.time(time.with_timezone(&Utc));
    }

    builder.build()
}

/// Binary-mode metadata for `envelope`, in a stable order.
pub fn binary_attributes(envelope: &Envelope) -> Vec<(&'static str, String)> {
    let mut attrs = vec![
        (CE_SPECVERSION, envelope.spec_version().to_string()),
        (CE_ID, envelope.id().to_string()),
        (CE_TYPE, envelope.event_type().to_string()),
        (CE_SOURCE, envelope.source().to_string()),
    ];
    if let Some(time) = envelope.time() {
        attrs.push((CE_TIME, time.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
    }
    if let Some(subject) = envelope.subject() {
        attrs.push((CE_SUBJECT, subject.to_string()));
    }
    if let Some(ct) = envelope.content_type() {
        attrs.push((CONTENT_TYPE, ct.to_string()));
    }
    attrs
}
