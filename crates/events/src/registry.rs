//! Event type → payload decoder registry.
//!
//! The registry is built once at startup, then shared read-only (typically
//! through a [`Dispatcher`](crate::Dispatcher)). Lookups are exact,
//! case-sensitive string matches on the envelope's `type`.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::envelope::Envelope;
use crate::error::{BoxError, DispatchError};
use crate::payload::{AUDIT_LOG_WRITTEN, DecodedPayload, MESSAGE_PUBLISHED, PUBSUB_PUBLISH};

/// Payload decode function: raw data bytes in, typed payload out.
pub type DecodeFn = Box<dyn Fn(&[u8]) -> Result<DecodedPayload, BoxError> + Send + Sync>;

/// One registered decoder.
pub struct DecoderEntry {
    type_key: String,
    decode_fn: DecodeFn,
}

impl DecoderEntry {
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn decode(&self, data: &[u8]) -> Result<DecodedPayload, BoxError> {
        (self.decode_fn)(data)
    }
}

impl fmt::Debug for DecoderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderEntry")
            .field("type_key", &self.type_key)
            .finish_non_exhaustive()
    }
}

/// Maps event type strings to decoders.
#[derive(Debug, Default)]
pub struct DecoderRegistry {
    entries: HashMap<String, DecoderEntry>,
}

impl DecoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the Pub/Sub and audit log decoders registered.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert(MESSAGE_PUBLISHED, Box::new(json_decoder(DecodedPayload::MessagePublished)));
        registry.insert(PUBSUB_PUBLISH, Box::new(json_decoder(DecodedPayload::PubsubMessage)));
        registry.insert(AUDIT_LOG_WRITTEN, Box::new(json_decoder(DecodedPayload::AuditLog)));
        registry
    }

    /// Register a decoder for `type_key`.
    ///
    /// Fails with [`DispatchError::DuplicateType`] if the key is taken; the
    /// existing decoder stays in place.
    pub fn register<F>(&mut self, type_key: impl Into<String>, decode_fn: F) -> Result<(), DispatchError>
    where
        F: Fn(&[u8]) -> Result<DecodedPayload, BoxError> + Send + Sync + 'static,
    {
        let type_key = type_key.into();
        if self.entries.contains_key(&type_key) {
            return Err(DispatchError::duplicate(type_key));
        }
        self.insert(type_key, Box::new(decode_fn));
        Ok(())
    }

    /// Decode an envelope's data using the decoder registered for its type.
    pub fn decode(&self, envelope: &Envelope) -> Result<DecodedPayload, DispatchError> {
        let event_type = envelope.event_type();
        let entry = self
            .entries
            .get(event_type)
            .ok_or_else(|| DispatchError::unknown(event_type))?;

        entry
            .decode(envelope.data())
            .map_err(|cause| DispatchError::malformed(entry.type_key(), cause))
    }

    pub fn contains(&self, type_key: &str) -> bool {
        self.entries.contains_key(type_key)
    }

    /// Registered type keys, sorted.
    pub fn type_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, type_key: impl Into<String>, decode_fn: DecodeFn) {
        let type_key = type_key.into();
        self.entries.insert(
            type_key.clone(),
            DecoderEntry {
                type_key,
                decode_fn,
            },
        );
    }
}

/// Build a decode function that parses JSON into `T` and wraps it.
pub fn json_decoder<T, W>(wrap: W) -> impl Fn(&[u8]) -> Result<DecodedPayload, BoxError> + Send + Sync + 'static
where
    T: DeserializeOwned + 'static,
    W: Fn(T) -> DecodedPayload + Send + Sync + 'static,
{
    move |data: &[u8]| {
        let value: T = serde_json::from_slice(data)?;
        Ok(wrap(value))
    }
}
