use std::path::PathBuf;

use anyhow::Context;
use stream_logging::stream_info;
use stream_monitor::{load_config, DEFAULT_CONFIG_FILE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config =
        load_config(&path).with_context(|| format!("loading config from {}", path.display()))?;

    stream_logging::initialize(config.log_destination.into(), config.log_level.into());
    stream_info!("stream_monitor starting with config {:?}", path);

    stream_monitor::run(config)
        .await
        .context("stream monitor failed")
}
