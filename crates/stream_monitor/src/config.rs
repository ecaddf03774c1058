use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use stream_core::{BackoffPolicy, DEFAULT_MAX_ITEMS};
use stream_engine::{ChannelOptions, StreamSettings};
use stream_logging::{stream_info, LogDestination};

/// Config file read when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "stream_monitor.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Monitor settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Falls back to `TRADING_API_URL` when unset.
    pub api_origin: Option<String>,
    /// Scope for the signal, trade and portfolio streams.
    pub portfolio_id: Option<String>,
    pub max_items: usize,
    pub channels: ChannelToggles,
    pub reconnect: ReconnectConfig,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: Option<u64>,
    pub log_destination: LogTarget,
    pub log_level: LogLevel,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_origin: None,
            portfolio_id: None,
            max_items: DEFAULT_MAX_ITEMS,
            channels: ChannelToggles::default(),
            reconnect: ReconnectConfig::default(),
            connect_timeout_ms: 10_000,
            idle_timeout_ms: None,
            log_destination: LogTarget::default(),
            log_level: LogLevel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelToggles {
    pub signals: bool,
    pub trades: bool,
    pub portfolio: bool,
    pub agent_activity: bool,
}

impl Default for ChannelToggles {
    fn default() -> Self {
        Self {
            signals: true,
            trades: true,
            portfolio: true,
            agent_activity: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub factor: u32,
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            base_delay_ms: duration_ms(policy.base),
            factor: policy.factor,
            max_delay_ms: duration_ms(policy.cap),
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(self.base_delay_ms),
            factor: self.factor,
            cap: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogTarget {
    File,
    #[default]
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl MonitorConfig {
    /// Stream settings: the environment's API origin, overridden by the
    /// config's own when present.
    pub fn stream_settings(&self) -> StreamSettings {
        let mut settings = StreamSettings::from_env();
        if let Some(origin) = &self.api_origin {
            settings.api_origin = Some(origin.clone());
        }
        settings.connect_timeout = Duration::from_millis(self.connect_timeout_ms);
        settings.idle_timeout = self.idle_timeout_ms.map(Duration::from_millis);
        settings.backoff = self.reconnect.policy();
        settings
    }

    pub fn channel_options(&self, enabled: bool) -> ChannelOptions {
        ChannelOptions {
            scope_id: self.portfolio_id.clone(),
            enabled,
            base_url: None,
            max_items: self.max_items,
        }
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        let reconnect = &self.reconnect;
        if reconnect.base_delay_ms == 0 {
            return Err(ConfigLoadError::Invalid(
                "reconnect.base_delay_ms must be positive".into(),
            ));
        }
        if reconnect.factor == 0 {
            return Err(ConfigLoadError::Invalid(
                "reconnect.factor must be at least 1".into(),
            ));
        }
        if reconnect.max_delay_ms < reconnect.base_delay_ms {
            return Err(ConfigLoadError::Invalid(
                "reconnect.max_delay_ms must not be below base_delay_ms".into(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid(
                "connect_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Loads the config at `path`. A missing file yields the defaults; anything
/// unreadable or malformed is an error.
pub fn load_config(path: &Path) -> Result<MonitorConfig, ConfigLoadError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            stream_info!("No config at {:?}; using defaults", path);
            return Ok(MonitorConfig::default());
        }
        Err(source) => {
            return Err(ConfigLoadError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: MonitorConfig = ron::from_str(&content).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
