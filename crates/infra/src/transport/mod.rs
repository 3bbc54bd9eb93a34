//! Infrastructure transport implementations.
//!
//! The transport contracts (`EventSender`, `EventSource`) live in
//! `cloudrelay-events` as pure mechanics. This module provides the
//! Google Cloud Pub/Sub implementation.

pub mod pubsub;
pub mod wire;
