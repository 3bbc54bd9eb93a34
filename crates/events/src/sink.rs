//! Standard handler: log decoded payloads.

use tracing::info;

use crate::envelope::Envelope;
use crate::payload::DecodedPayload;

/// Emit one structured log line describing `payload`.
///
/// Message data is logged as lossy UTF-8; audit entries log their severity.
pub fn log_payload(envelope: &Envelope, payload: &DecodedPayload) {
    match payload {
        DecodedPayload::MessagePublished(published) => {
            info!(
                event_id = %envelope.id(),
                event_type = %envelope.event_type(),
                message_id = %published.message.message_id,
                subscription = %published.subscription,
                data = %String::from_utf8_lossy(&published.message.data),
                "pubsub message published"
            );
        }
        DecodedPayload::PubsubMessage(message) => {
            info!(
                event_id = %envelope.id(),
                event_type = %envelope.event_type(),
                data = %message.data,
                "pubsub message"
            );
        }
        DecodedPayload::AuditLog(entry) => {
            info!(
                event_id = %envelope.id(),
                event_type = %envelope.event_type(),
                severity = %entry.severity,
                log_name = entry.log_name().unwrap_or_default(),
                method = entry.method_name().unwrap_or_default(),
                "audit log entry written"
            );
        }
    }
}
