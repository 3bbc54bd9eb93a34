//! Pub/Sub transport configuration.
//!
//! Everything the transport needs is carried in one [`PubSubConfig`] value
//! handed to its constructor. Binaries fill it from flags/environment.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Production Pub/Sub REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// When set, traffic goes to the local emulator at `http://<host>` without auth.
pub const EMULATOR_HOST_ENV: &str = "PUBSUB_EMULATOR_HOST";

/// OAuth2 bearer token used against the real endpoint.
pub const ACCESS_TOKEN_ENV: &str = "PUBSUB_ACCESS_TOKEN";

/// Upper bound enforced by the Pub/Sub `pull` API.
pub const MAX_PULL_MESSAGES: u32 = 1000;

const DEFAULT_MAX_MESSAGES: u32 = 10;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct PubSubConfig {
    pub project_id: String,
    /// Required for publishing.
    pub topic_id: Option<String>,
    /// Required for pulling.
    pub subscription_id: Option<String>,
    /// Base URL, without trailing slash.
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Messages requested per pull.
    pub max_messages: u32,
    pub request_timeout: Duration,
}

impl PubSubConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            topic_id: None,
            subscription_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            max_messages: DEFAULT_MAX_MESSAGES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_topic(mut self, topic_id: impl Into<String>) -> Self {
        self.topic_id = Some(topic_id.into());
        self
    }

    pub fn with_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_max_messages(mut self, max_messages: u32) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Apply the emulator/token environment variables.
    ///
    /// `PUBSUB_EMULATOR_HOST` wins over everything and clears the token;
    /// otherwise `PUBSUB_ACCESS_TOKEN` fills a missing token.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    pub fn with_env_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = var(EMULATOR_HOST_ENV).filter(|h| !h.trim().is_empty()) {
            self = self.with_endpoint(format!("http://{}", host.trim()));
            self.access_token = None;
            return self;
        }
        if self.access_token.is_none() {
            self.access_token = var(ACCESS_TOKEN_ENV).filter(|t| !t.is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::Missing("project_id"));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "endpoint",
                reason: format!("`{}` is not an http(s) URL", self.endpoint),
            });
        }
        if self.max_messages == 0 || self.max_messages > MAX_PULL_MESSAGES {
            return Err(ConfigError::Invalid {
                name: "max_messages",
                reason: format!("must be between 1 and {MAX_PULL_MESSAGES}"),
            });
        }
        Ok(())
    }

    /// `projects/{project}/topics/{topic}`.
    pub fn topic_path(&self) -> Result<String, ConfigError> {
        let topic = non_empty(self.topic_id.as_deref()).ok_or(ConfigError::Missing("topic_id"))?;
        Ok(format!("projects/{}/topics/{}", self.project_id, topic))
    }

    /// `projects/{project}/subscriptions/{subscription}`.
    pub fn subscription_path(&self) -> Result<String, ConfigError> {
        let sub = non_empty(self.subscription_id.as_deref())
            .ok_or(ConfigError::Missing("subscription_id"))?;
        Ok(format!("projects/{}/subscriptions/{}", self.project_id, sub))
    }
}

// Keep the token out of logs.
impl fmt::Debug for PubSubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubConfig")
            .field("project_id", &self.project_id)
            .field("topic_id", &self.topic_id)
            .field("subscription_id", &self.subscription_id)
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("max_messages", &self.max_messages)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
