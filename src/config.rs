//! Settings read by the dispatcher's callers.

use serde::Deserialize;

/// Deployment mode. Development skips analytics and bypasses the task queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
}

/// An HTTP endpoint with its API key.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSettings {
    /// Endpoint URL; webhook bases may be relative to the application.
    pub url: String,
    /// API key sent in the endpoint's key header, if any.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Settings read by the tracking and webhook helpers.
///
/// Deserialized by the host application from whatever source it reads
/// configuration from; every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Deployment mode, `production` unless set.
    #[serde(default)]
    pub mode: Mode,

    /// Base URL of the webhook handlers, absolute or relative to the application.
    #[serde(default)]
    pub webhooks: Option<EndpointSettings>,

    /// Task queue that relays webhook posts outside development.
    #[serde(default)]
    pub torque: Option<EndpointSettings>,

    /// Build webhook dispatches without posting them (functional tests).
    #[serde(default)]
    pub suppress_dispatch: bool,
}

impl Settings {
    /// Whether the application runs in development mode.
    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }
}
