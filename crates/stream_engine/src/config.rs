use std::time::Duration;

use stream_core::{BackoffPolicy, DEFAULT_MAX_ITEMS};
use url::Url;

use crate::connector::ConnectorSettings;

/// Environment variable holding the default API origin.
pub const API_ORIGIN_ENV: &str = "TRADING_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Origin used by channels that do not set their own base URL.
    pub api_origin: Option<String>,
    pub connect_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub backoff: BackoffPolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            api_origin: None,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: None,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl StreamSettings {
    /// Defaults, with the API origin taken from [`API_ORIGIN_ENV`] when set.
    pub fn from_env() -> Self {
        let api_origin = std::env::var(API_ORIGIN_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            api_origin,
            ..Self::default()
        }
    }

    pub fn connector_settings(&self) -> ConnectorSettings {
        ConnectorSettings {
            backoff: self.backoff,
            connect_timeout: self.connect_timeout,
            idle_timeout: self.idle_timeout,
        }
    }
}

/// Per-channel inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Scope path segment, e.g. a portfolio id.
    pub scope_id: Option<String>,
    pub enabled: bool,
    /// Overrides [`StreamSettings::api_origin`].
    pub base_url: Option<String>,
    pub max_items: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            scope_id: None,
            enabled: true,
            base_url: None,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl ChannelOptions {
    pub fn scoped(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: Some(scope_id.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no base url configured; set one on the channel or via {API_ORIGIN_ENV}")]
    MissingBaseUrl,
    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("scope id must not be empty")]
    EmptyScope,
    #[error("max_items must be at least 1")]
    ZeroCapacity,
    #[error("channels must be created inside a tokio runtime")]
    NoRuntime,
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// `{base}/api/stream/{path}[/{scope}]`.
pub fn build_endpoint(base: &str, path: &str, scope: Option<&str>) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        url: base.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(base.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http or https url"));
    }

    let scope = match scope.map(str::trim) {
        Some("") => return Err(ConfigError::EmptyScope),
        other => other,
    };

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| invalid("url cannot be a base"))?;
        segments.pop_if_empty().extend(["api", "stream", path]);
        if let Some(scope) = scope {
            segments.push(scope);
        }
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
