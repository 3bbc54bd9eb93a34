use std::time::Duration;

use clap::{Parser, ValueEnum};

use cloudrelay_infra::config::DEFAULT_ENDPOINT;
use cloudrelay_infra::{ConfigError, PubSubConfig};
use cloudrelay_observability::LogFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Pull CloudEvents from a subscription and log their payloads
    Subscribe,
    /// Publish one CloudEvent wrapping `--message` to a topic
    Publish,
}

/// Pub/Sub CloudEvents tool
#[derive(Debug, Clone, Parser)]
#[command(name = "cloudrelay-pubsub")]
#[command(about = "Subscribe to or publish CloudEvents on Google Cloud Pub/Sub", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Google Cloud project id
    #[arg(long, env = "PUBSUB_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Topic to publish to
    #[arg(long, env = "PUBSUB_TOPIC_ID")]
    pub topic_id: Option<String>,

    /// Subscription to pull from
    #[arg(long, env = "PUBSUB_SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    #[arg(long, value_enum, default_value_t = Mode::Subscribe)]
    pub mode: Mode,

    /// Message carried by the published event
    #[arg(long, default_value = "fooo")]
    pub message: String,

    /// Pub/Sub REST endpoint (`PUBSUB_EMULATOR_HOST` overrides it)
    #[arg(long, env = "PUBSUB_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Messages requested per pull
    #[arg(long, default_value_t = 10)]
    pub max_messages: u32,

    /// HTTP request timeout for Pub/Sub calls
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Emit JSON log lines
    #[arg(long, env = "CLOUDRELAY_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_json_flag(self.log_json)
    }

    /// Transport configuration for the selected mode, with the
    /// emulator/token environment applied.
    pub fn pubsub_config(&self) -> Result<PubSubConfig, ConfigError> {
        self.pubsub_config_with_env(|key| std::env::var(key).ok())
    }

    pub fn pubsub_config_with_env(
        &self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<PubSubConfig, ConfigError> {
        let project_id = self
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::Missing("project_id"))?;

        let mut config = PubSubConfig::new(project_id)
            .with_endpoint(self.endpoint.clone())
            .with_max_messages(self.max_messages)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_env_from(var);
        if let Some(topic) = &self.topic_id {
            config = config.with_topic(topic.clone());
        }
        if let Some(subscription) = &self.subscription_id {
            config = config.with_subscription(subscription.clone());
        }

        config.validate()?;
        match self.mode {
            Mode::Publish => config.topic_path().map(|_| ())?,
            Mode::Subscribe => config.subscription_path().map(|_| ())?,
        }
        Ok(config)
    }
}
