//! HTTP receiver for CloudEvents pushed over the CloudEvents HTTP binding.

pub mod app;
pub mod config;
