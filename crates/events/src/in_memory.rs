//! In-memory transport for tests/dev.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::envelope::Envelope;
use crate::transport::{Delivery, DeliveryContext, EventSender, EventSource, Receipt, TransportError};

const DEFAULT_BATCH_SIZE: usize = 10;

/// In-memory queue implementing both sides of a transport.
///
/// - No IO
/// - Sent envelopes are queued in order and handed out by `receive`
/// - `nack` puts a delivery back at the head of the queue (redelivery)
/// - `receive` waits for messages until [`close`](Self::close) is called
#[derive(Debug)]
pub struct InMemoryTransport {
    state: Mutex<State>,
    notify: Notify,
    batch_size: usize,
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<Queued>,
    in_flight: HashMap<String, Queued>,
    next_id: u64,
    acked: Vec<String>,
    nacked: usize,
    closed: bool,
}

#[derive(Debug, Clone)]
struct Queued {
    message_id: String,
    envelope: Envelope,
    attempt: u32,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Stop accepting sends; pending receivers drain the queue, then get `Closed`.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Number of envelopes waiting to be received.
    pub fn pending(&self) -> usize {
        self.lock().map(|s| s.queue.len()).unwrap_or_default()
    }

    /// Broker message ids acknowledged so far, in ack order.
    pub fn acked(&self) -> Vec<String> {
        self.lock().map(|s| s.acked.clone()).unwrap_or_default()
    }

    pub fn nacked_count(&self) -> usize {
        self.lock().map(|s| s.nacked).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, TransportError> {
        self.state
            .lock()
            .map_err(|_| TransportError::Backend("in-memory transport lock poisoned".to_string()))
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[async_trait]
impl EventSender for InMemoryTransport {
    async fn send(&self, envelope: &Envelope) -> Result<Receipt, TransportError> {
        let message_id = {
            let mut state = self.lock()?;
            if state.closed {
                return Err(TransportError::Undelivered("transport closed".to_string()));
            }
            state.next_id += 1;
            let message_id = state.next_id.to_string();
            state.queue.push_back(Queued {
                message_id: message_id.clone(),
                envelope: envelope.clone(),
                attempt: 0,
            });
            message_id
        };

        self.notify.notify_one();
        Ok(Receipt::new(message_id))
    }
}

#[async_trait]
impl EventSource for InMemoryTransport {
    async fn receive(&self) -> Result<Vec<Delivery>, TransportError> {
        loop {
            {
                let mut state = self.lock()?;
                if !state.queue.is_empty() {
                    let take = state.queue.len().min(self.batch_size);
                    let drained: Vec<Queued> = state.queue.drain(..take).collect();
                    let mut batch = Vec::with_capacity(take);
                    for mut queued in drained {
                        queued.attempt += 1;
                        batch.push(Delivery::new(
                            queued.envelope.clone(),
                            DeliveryContext {
                                ack_id: queued.message_id.clone(),
                                message_id: Some(queued.message_id.clone()),
                                publish_time: Some(Utc::now()),
                                delivery_attempt: Some(queued.attempt),
                                subscription: None,
                            },
                        ));
                        state.in_flight.insert(queued.message_id.clone(), queued);
                    }
                    return Ok(batch);
                }
                if state.closed {
                    return Err(TransportError::Closed);
                }
            }
            // A send between the unlock above and this await leaves a permit behind.
            self.notify.notified().await;
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        match state.in_flight.remove(delivery.ack_id()) {
            Some(queued) => {
                state.acked.push(queued.message_id);
                Ok(())
            }
            None => Err(TransportError::Backend(format!(
                "unknown ack id {}",
                delivery.ack_id()
            ))),
        }
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        {
            let mut state = self.lock()?;
            let queued = state.in_flight.remove(delivery.ack_id()).ok_or_else(|| {
                TransportError::Backend(format!("unknown ack id {}", delivery.ack_id()))
            })?;
            state.nacked += 1;
            state.queue.push_front(queued);
        }
        self.notify.notify_one();
        Ok(())
    }
}
