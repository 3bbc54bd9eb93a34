//! `cloudrelay-pubsub`: subscribe to or publish CloudEvents on Google Cloud Pub/Sub.

pub mod config;
pub mod run;

pub use config::{Cli, Mode};
