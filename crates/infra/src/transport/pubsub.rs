//! Google Cloud Pub/Sub transport over the REST API.
//!
//! - `send` → `projects.topics.publish`
//! - `receive` → `projects.subscriptions.pull`
//! - `ack` → `projects.subscriptions.acknowledge`
//! - `nack` → `projects.subscriptions.modifyAckDeadline` with a zero deadline,
//!   which makes the message immediately eligible for redelivery
//!
//! Redelivery limits and dead-lettering are subscription settings on the
//! broker side; nothing here retries.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use cloudrelay_events::{Delivery, Envelope, EventSender, EventSource, Receipt, TransportError};

use crate::config::{ConfigError, PubSubConfig};
use crate::transport::wire::{
    AcknowledgeRequest, ModifyAckDeadlineRequest, PublishRequest, PublishResponse, PullRequest,
    PullResponse, from_wire, to_wire,
};

#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("Pub/Sub configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pub/Sub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pub/Sub returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected Pub/Sub response: {0}")]
    Response(String),
}

impl From<PubSubError> for TransportError {
    fn from(value: PubSubError) -> Self {
        TransportError::Backend(value.to_string())
    }
}

/// Pub/Sub-backed transport implementing both [`EventSender`] and [`EventSource`].
///
/// Publishing needs `topic_id`; receiving needs `subscription_id`. A missing id
/// only fails the operation that needs it.
#[derive(Debug, Clone)]
pub struct PubSubTransport {
    http: reqwest::Client,
    config: PubSubConfig,
}

impl PubSubTransport {
    pub fn new(config: PubSubConfig) -> Result<Self, PubSubError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &PubSubConfig {
        &self.config
    }

    /// Publish envelopes to the configured topic; returns broker message ids.
    #[instrument(skip(self, envelopes), fields(count = envelopes.len()))]
    pub async fn publish(&self, envelopes: &[&Envelope]) -> Result<Vec<String>, PubSubError> {
        let topic = self.config.topic_path()?;
        let request = PublishRequest {
            messages: envelopes.iter().map(|env| to_wire(env)).collect(),
        };

        let response: PublishResponse = self.post(&format!("{topic}:publish"), &request).await?;
        if response.message_ids.len() != envelopes.len() {
            return Err(PubSubError::Response(format!(
                "expected {} message ids, got {}",
                envelopes.len(),
                response.message_ids.len()
            )));
        }
        Ok(response.message_ids)
    }

    /// Pull up to `max_messages` deliveries from the configured subscription.
    ///
    /// Messages that are not CloudEvents are nacked and skipped. A failed nack
    /// is logged and does not fail the pull.
    pub async fn pull(&self) -> Result<Vec<Delivery>, PubSubError> {
        let subscription = self.config.subscription_path()?;
        let request = PullRequest {
            max_messages: self.config.max_messages,
        };

        let response: PullResponse = self.post(&format!("{subscription}:pull"), &request).await?;
        debug!(count = response.received_messages.len(), "pulled messages");

        let mut deliveries = Vec::with_capacity(response.received_messages.len());
        let mut rejected = Vec::new();
        for received in &response.received_messages {
            match from_wire(received, &subscription) {
                Ok(delivery) => deliveries.push(delivery),
                Err(err) => {
                    warn!(
                        message_id = %received.message.message_id,
                        error = %err,
                        "pulled message is not a valid CloudEvent; nacking"
                    );
                    rejected.push(received.ack_id.clone());
                }
            }
        }

        // Leased deliveries must still reach the caller.
        if !rejected.is_empty() {
            let count = rejected.len();
            if let Err(err) = self.modify_ack_deadline(rejected, 0).await {
                warn!(count, error = %err, "failed to nack rejected messages");
            }
        }
        Ok(deliveries)
    }

    pub async fn acknowledge(&self, ack_ids: Vec<String>) -> Result<(), PubSubError> {
        let subscription = self.config.subscription_path()?;
        let _: serde_json::Value = self
            .post(
                &format!("{subscription}:acknowledge"),
                &AcknowledgeRequest { ack_ids },
            )
            .await?;
        Ok(())
    }

    pub async fn modify_ack_deadline(
        &self,
        ack_ids: Vec<String>,
        ack_deadline_seconds: u32,
    ) -> Result<(), PubSubError> {
        let subscription = self.config.subscription_path()?;
        let _: serde_json::Value = self
            .post(
                &format!("{subscription}:modifyAckDeadline"),
                &ModifyAckDeadlineRequest {
                    ack_ids,
                    ack_deadline_seconds,
                },
            )
            .await?;
        Ok(())
    }

    async fn post<B, R>(&self, resource: &str, body: &B) -> Result<R, PubSubError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/v1/{}", self.config.endpoint, resource);
        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PubSubError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return serde_json::from_slice(b"{}").map_err(|e| PubSubError::Response(e.to_string()));
        }
        serde_json::from_slice(&bytes).map_err(|e| PubSubError::Response(e.to_string()))
    }
}

#[async_trait]
impl EventSender for PubSubTransport {
    async fn send(&self, envelope: &Envelope) -> Result<Receipt, TransportError> {
        let ids = self
            .publish(&[envelope])
            .await
            .map_err(|e| TransportError::Undelivered(e.to_string()))?;
        ids.into_iter()
            .next()
            .map(Receipt::new)
            .ok_or_else(|| TransportError::Undelivered("no message id returned".to_string()))
    }
}

#[async_trait]
impl EventSource for PubSubTransport {
    async fn receive(&self) -> Result<Vec<Delivery>, TransportError> {
        Ok(self.pull().await?)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        Ok(self.acknowledge(vec![delivery.ack_id().to_string()]).await?)
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        Ok(self
            .modify_ack_deadline(vec![delivery.ack_id().to_string()], 0)
            .await?)
    }
}
