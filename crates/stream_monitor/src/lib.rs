//! Terminal monitor for the dashboard streams: mounts the signal, trade,
//! portfolio and agent-activity channels and prints what they report.
mod config;
mod monitor;

pub use config::{
    load_config, ChannelToggles, ConfigLoadError, LogLevel, LogTarget, MonitorConfig,
    ReconnectConfig, DEFAULT_CONFIG_FILE,
};
pub use monitor::{
    describe_lifecycle, format_portfolio, format_progress, format_signal, format_trade, run,
    Monitor,
};
