//! Envelope dispatch: resolve the decoder, decode, hand off to a handler.
//!
//! ```text
//! Envelope ─→ Dispatcher ─→ DecoderRegistry::decode ─→ DecodedPayload ─→ handler
//!                 │                    │
//!                 └──── DispatchError ←┘ (handler not called)
//! ```
//!
//! The dispatcher does no IO and no retries. Receive loops decide what a
//! failed dispatch means for the delivery (nack, HTTP 5xx, ...).

use std::sync::Arc;

use crate::envelope::Envelope;
use crate::error::DispatchError;
use crate::payload::DecodedPayload;
use crate::registry::DecoderRegistry;

/// Routes envelopes to handlers through a read-only [`DecoderRegistry`].
///
/// Cloning is cheap (the registry is shared), so one dispatcher can serve
/// any number of concurrent deliveries.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<DecoderRegistry>,
}

impl Dispatcher {
    pub fn new(registry: DecoderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    /// Decode `envelope` and pass the payload to `handler`.
    ///
    /// On success the handler runs exactly once and its return value is
    /// passed through. On error the handler is not called.
    pub fn dispatch<H, R>(&self, envelope: &Envelope, handler: H) -> Result<R, DispatchError>
    where
        H: FnOnce(DecodedPayload) -> R,
    {
        let payload = self.registry.decode(envelope)?;
        Ok(handler(payload))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DecoderRegistry::standard())
    }
}
