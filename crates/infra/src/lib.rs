//! Infrastructure layer: Pub/Sub transport, receive workers, configuration.

pub mod config;
pub mod transport;
pub mod workers;

pub use config::{ConfigError, PubSubConfig};
pub use transport::pubsub::{PubSubError, PubSubTransport};
pub use workers::receive_worker::{ReceiveWorker, ReceiveWorkerConfig, WorkerHandle, WorkerStats};
