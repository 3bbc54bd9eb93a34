use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use cloudrelay_events::log_payload;

use crate::app::binding::envelope_from_request;
use crate::app::errors::{dispatch_error_to_response, envelope_error_to_response};
use crate::app::services::AppServices;

/// `POST /`: decode one pushed CloudEvent and log its payload.
pub async fn receive(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let envelope = match envelope_from_request(&headers, body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "rejected request: not a CloudEvent");
            return envelope_error_to_response(err);
        }
    };

    info!(
        event_id = %envelope.id(),
        event_type = %envelope.event_type(),
        source = %envelope.source(),
        subject = envelope.subject().unwrap_or_default(),
        "received event"
    );

    match services
        .dispatcher
        .dispatch(&envelope, |payload| log_payload(&envelope, &payload))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(
                event_id = %envelope.id(),
                event_type = %err.event_type(),
                error = %err,
                "failed to dispatch event"
            );
            dispatch_error_to_response(err)
        }
    }
}
