use std::future::Future;

use tracing::{info, warn};

use cloudrelay_events::{
    Dispatcher, EventSender, EventSource, Receipt, TransportError, log_payload, publish_envelope,
};
use cloudrelay_infra::{ReceiveWorker, ReceiveWorkerConfig, WorkerStats};

/// Pull and dispatch until `shutdown` resolves, logging each payload.
pub async fn subscribe<S, F>(source: S, shutdown: F) -> WorkerStats
where
    S: EventSource,
    F: Future<Output = ()>,
{
    let dispatcher = Dispatcher::default();
    info!(
        count = dispatcher.registry().len(),
        event_types = ?dispatcher.registry().type_keys(),
        "decoders registered"
    );

    ReceiveWorker::run(
        ReceiveWorkerConfig::default().with_name("pubsub-subscriber"),
        source,
        dispatcher,
        |envelope, payload| log_payload(envelope, &payload),
        shutdown,
    )
    .await
}

/// Publish one event wrapping `message`.
pub async fn publish<S: EventSender>(sender: &S, message: &str) -> Result<Receipt, TransportError> {
    let envelope = publish_envelope(message)?;
    let receipt = sender.send(&envelope).await?;
    info!(
        event_id = %envelope.id(),
        message_id = %receipt.message_id(),
        "sent, accepted"
    );
    Ok(receipt)
}

/// Resolves on ctrl-c. If the signal handler cannot be installed, never resolves.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cloudrelay_events::{DecodedPayload, InMemoryTransport, PUBSUB_PUBLISH};

    use super::*;

    #[tokio::test]
    async fn publish_then_subscribe_round_trip() {
        let transport = Arc::new(InMemoryTransport::new());

        let receipt = publish(&transport, "fooo").await.unwrap();
        assert!(!receipt.message_id().is_empty());

        let deliveries = transport.receive().await.unwrap();
        let envelope = deliveries[0].envelope();
        assert_eq!(envelope.event_type(), PUBSUB_PUBLISH);

        let data = Dispatcher::default()
            .dispatch(envelope, |payload| match payload {
                DecodedPayload::PubsubMessage(m) => m.data,
                other => panic!("unexpected payload {other:?}"),
            })
            .unwrap();
        assert_eq!(data, "fooo");
    }

    #[tokio::test]
    async fn publish_to_closed_transport_fails() {
        let transport = InMemoryTransport::new();
        transport.close();

        assert!(publish(&transport, "fooo").await.is_err());
    }

    #[tokio::test]
    async fn subscribe_acks_until_source_closes() {
        let transport = Arc::new(InMemoryTransport::new());
        publish(&transport, "one").await.unwrap();
        publish(&transport, "two").await.unwrap();
        transport.close();

        let stats = subscribe(transport.clone(), std::future::pending()).await;
        assert_eq!(stats.dispatched, 2);
        assert_eq!(transport.acked().len(), 2);
    }
}
