use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use cloudrelay_events::{DispatchError, EnvelopeError};

/// A request that is not a valid CloudEvent is the sender's fault.
pub fn envelope_error_to_response(err: EnvelopeError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_cloudevent", err.to_string())
}

/// Dispatch failures answer 5xx so push subscriptions redeliver.
pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    let code = match &err {
        DispatchError::UnknownEventType { .. } => "unknown_event_type",
        DispatchError::MalformedPayload { .. } => "malformed_payload",
        DispatchError::DuplicateType { .. } => "duplicate_event_type",
    };
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
