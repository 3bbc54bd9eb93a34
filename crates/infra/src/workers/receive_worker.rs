use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use cloudrelay_events::{DecodedPayload, Delivery, Dispatcher, Envelope, EventSource, TransportError};

/// Receive worker configuration.
#[derive(Debug, Clone)]
pub struct ReceiveWorkerConfig {
    /// Name for logging
    pub name: String,
    /// Pause after a failed `receive` before polling again
    pub error_backoff: Duration,
}

impl Default for ReceiveWorkerConfig {
    fn default() -> Self {
        Self {
            name: "receive-worker".to_string(),
            error_backoff: Duration::from_secs(1),
        }
    }
}

impl ReceiveWorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Counters reported when a worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub dispatched: u64,
    pub failed: u64,
    /// `ack`/`nack` calls that themselves failed.
    pub settle_errors: u64,
    pub receive_errors: u64,
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub async fn shutdown(self) -> WorkerStats {
        let _ = self.shutdown.send(true);
        self.join.await.unwrap_or_default()
    }

    /// Wait for the worker to stop on its own (its source closed).
    pub async fn join(self) -> WorkerStats {
        self.join.await.unwrap_or_default()
    }
}

/// Generic receive loop.
///
/// - Pulls batches from an [`EventSource`]
/// - Dispatches each envelope and calls `handler` with the decoded payload
/// - Acks successful deliveries, nacks failed ones (the broker redelivers)
/// - Stops on shutdown or when the source reports [`TransportError::Closed`]
#[derive(Debug)]
pub struct ReceiveWorker;

impl ReceiveWorker {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn<S, H>(
        config: ReceiveWorkerConfig,
        source: S,
        dispatcher: Dispatcher,
        handler: H,
    ) -> WorkerHandle
    where
        S: EventSource + 'static,
        H: Fn(&Envelope, DecodedPayload) + Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let shutdown = async move {
                // Sender dropped counts as shutdown too.
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            };
            Self::run(config, source, dispatcher, handler, shutdown).await
        });

        WorkerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    /// Run the loop in the current task until `shutdown` resolves.
    pub async fn run<S, H, F>(
        config: ReceiveWorkerConfig,
        source: S,
        dispatcher: Dispatcher,
        handler: H,
        shutdown: F,
    ) -> WorkerStats
    where
        S: EventSource,
        H: Fn(&Envelope, DecodedPayload),
        F: Future<Output = ()>,
    {
        let mut stats = WorkerStats::default();
        tokio::pin!(shutdown);

        if dispatcher.registry().is_empty() {
            warn!(worker = %config.name, "no decoders registered; every delivery will be nacked");
        }
        info!(worker = %config.name, "receive worker started");
        loop {
            let batch = tokio::select! {
                _ = &mut shutdown => break,
                batch = source.receive() => batch,
            };

            match batch {
                Ok(deliveries) => {
                    for delivery in deliveries {
                        process(&config.name, &source, &dispatcher, &handler, &delivery, &mut stats).await;
                    }
                }
                Err(TransportError::Closed) => break,
                Err(err) => {
                    stats.receive_errors += 1;
                    warn!(worker = %config.name, error = %err, "receive failed");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(config.error_backoff) => {}
                    }
                }
            }
        }

        info!(
            worker = %config.name,
            received = stats.received,
            dispatched = stats.dispatched,
            failed = stats.failed,
            "receive worker stopped"
        );
        stats
    }
}

async fn process<S, H>(
    name: &str,
    source: &S,
    dispatcher: &Dispatcher,
    handler: &H,
    delivery: &Delivery,
    stats: &mut WorkerStats,
) where
    S: EventSource,
    H: Fn(&Envelope, DecodedPayload),
{
    let envelope = delivery.envelope();
    let ctx = delivery.context();
    stats.received += 1;

    info!(
        worker = %name,
        event_id = %envelope.id(),
        event_type = %envelope.event_type(),
        source = %envelope.source(),
        message_id = ctx.message_id.as_deref().unwrap_or_default(),
        delivery_attempt = ctx.delivery_attempt.unwrap_or_default(),
        "received event"
    );

    let settled = match dispatcher.dispatch(envelope, |payload| handler(envelope, payload)) {
        Ok(()) => {
            stats.dispatched += 1;
            source.ack(delivery).await
        }
        Err(err) => {
            stats.failed += 1;
            warn!(
                worker = %name,
                event_id = %envelope.id(),
                event_type = %err.event_type(),
                error = %err,
                "dispatch failed; nacking delivery"
            );
            source.nack(delivery).await
        }
    };

    if let Err(err) = settled {
        stats.settle_errors += 1;
        warn!(worker = %name, event_id = %envelope.id(), error = %err, "failed to settle delivery");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use cloudrelay_events::{Envelope, EventSender, InMemoryTransport, publish_envelope};

    use super::*;

    fn unknown_event() -> Envelope {
        Envelope::builder()
            .id("bad-1")
            .event_type("not.a.real.type")
            .source("//tests")
            .data(b"{}".to_vec())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn acks_dispatched_and_nacks_failed() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.send(&publish_envelope("fooo").unwrap()).await.unwrap();
        transport.send(&unknown_event()).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let seen = seen.clone();
            move |_: &Envelope, payload: DecodedPayload| {
                if let DecodedPayload::PubsubMessage(m) = payload {
                    seen.lock().unwrap().push(m.data);
                }
            }
        };

        // Stop after the first pass: one batch holds both messages.
        let stop = {
            let transport = transport.clone();
            async move {
                while transport.acked().is_empty() || transport.nacked_count() == 0 {
                    tokio::task::yield_now().await;
                }
            }
        };

        let stats = ReceiveWorker::run(
            ReceiveWorkerConfig::default().with_name("test"),
            transport.clone(),
            Dispatcher::default(),
            handler,
            stop,
        )
        .await;

        assert_eq!(*seen.lock().unwrap(), vec!["fooo".to_string()]);
        assert_eq!(transport.acked(), vec!["1".to_string()]);
        assert!(transport.nacked_count() >= 1);
        assert!(stats.dispatched >= 1);
        assert!(stats.failed >= 1);
    }

    #[tokio::test]
    async fn stops_when_source_closes() {
        let transport = Arc::new(InMemoryTransport::new());
        for i in 0..3 {
            transport.send(&publish_envelope(format!("m{i}")).unwrap()).await.unwrap();
        }
        transport.close();

        let handle = ReceiveWorker::spawn(
            ReceiveWorkerConfig::default(),
            transport.clone(),
            Dispatcher::default(),
            |_, _| {},
        );

        let stats = tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .unwrap();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.dispatched, 3);
        assert_eq!(transport.acked().len(), 3);
    }

    #[tokio::test]
    async fn shutdown_interrupts_idle_receive() {
        let transport = Arc::new(InMemoryTransport::new());
        let handle = ReceiveWorker::spawn(
            ReceiveWorkerConfig::default(),
            transport,
            Dispatcher::default(),
            |_, _| {},
        );

        let stats = tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .unwrap();
        assert_eq!(stats, WorkerStats::default());
    }
}
