use std::future::Future;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use stream_core::payload::{PortfolioSnapshot, Signal, Trade};
use stream_core::{classify, stage_steps, ChannelUpdate, ProgressState, RunProgress, StepStatus};
use stream_engine::{
    AgentActivityChannel, ConfigError, PortfolioChannel, SignalChannel, TradeChannel, Transport,
};
use stream_logging::{stream_error, stream_info, stream_warn};

use crate::config::MonitorConfig;

/// The four dashboard channels plus the progress of the analysis run that
/// the agent-activity stream reports on.
pub struct Monitor {
    signals: SignalChannel,
    trades: TradeChannel,
    portfolio: PortfolioChannel,
    activity: AgentActivityChannel,
    run: RunProgress,
}

impl Monitor {
    /// Mounts every enabled channel over HTTP. Must be called within a tokio
    /// runtime.
    pub fn new(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let settings = config.stream_settings();
        let toggles = config.channels;
        Ok(Self {
            signals: SignalChannel::new(config.channel_options(toggles.signals), &settings)?,
            trades: TradeChannel::new(config.channel_options(toggles.trades), &settings)?,
            portfolio: PortfolioChannel::new(config.channel_options(toggles.portfolio), &settings)?,
            activity: AgentActivityChannel::new(
                config.channel_options(toggles.agent_activity),
                &settings,
            )?,
            run: RunProgress::new(),
        })
    }

    pub fn with_transport(
        config: &MonitorConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let settings = config.stream_settings();
        let toggles = config.channels;
        Ok(Self {
            signals: SignalChannel::with_transport(
                config.channel_options(toggles.signals),
                &settings,
                transport.clone(),
            )?,
            trades: TradeChannel::with_transport(
                config.channel_options(toggles.trades),
                &settings,
                transport.clone(),
            )?,
            portfolio: PortfolioChannel::with_transport(
                config.channel_options(toggles.portfolio),
                &settings,
                transport.clone(),
            )?,
            activity: AgentActivityChannel::with_transport(
                config.channel_options(toggles.agent_activity),
                &settings,
                transport,
            )?,
            run: RunProgress::new(),
        })
    }

    /// Latest progress of the observed analysis run, if any stage was seen.
    pub fn run_progress(&self) -> Option<ProgressState> {
        self.run.current()
    }

    /// Waits for the next update on any channel and renders it as one
    /// timestamped line. `None` once no channel is mounted.
    pub async fn next_line(&mut self) -> Option<String> {
        let (channel, body) = tokio::select! {
            Some(update) = self.signals.next_update(), if self.signals.is_mounted() => {
                ("signals", self.describe_signal(&update))
            }
            Some(update) = self.trades.next_update(), if self.trades.is_mounted() => {
                ("trades", self.describe_trade(&update))
            }
            Some(update) = self.portfolio.next_update(), if self.portfolio.is_mounted() => {
                ("portfolio", self.describe_portfolio(&update))
            }
            Some(update) = self.activity.next_update(), if self.activity.is_mounted() => {
                ("agent-activity", self.describe_activity(&update))
            }
            else => return None,
        };
        Some(format!("{} [{}] {}", timestamp(), channel, body))
    }

    /// Prints lines until `shutdown` resolves or every channel is gone, then
    /// disposes all channels.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    stream_info!("Shutdown requested");
                    break;
                }
                line = self.next_line() => match line {
                    Some(line) => println!("{line}"),
                    None => {
                        stream_warn!("No channel enabled; nothing to monitor");
                        break;
                    }
                },
            }
        }
        self.dispose();
    }

    pub fn dispose(&mut self) {
        self.signals.dispose();
        self.trades.dispose();
        self.portfolio.dispose();
        self.activity.dispose();
    }

    fn describe_signal(&self, update: &ChannelUpdate) -> String {
        match (update, self.signals.items().latest()) {
            (ChannelUpdate::ItemAdded, Some(signal)) => format_signal(signal),
            _ => describe_lifecycle(update),
        }
    }

    fn describe_trade(&self, update: &ChannelUpdate) -> String {
        match (update, self.trades.items().latest()) {
            (ChannelUpdate::ItemAdded, Some(trade)) => format_trade(trade),
            _ => describe_lifecycle(update),
        }
    }

    fn describe_portfolio(&self, update: &ChannelUpdate) -> String {
        match (update, self.portfolio.snapshot().data) {
            (ChannelUpdate::ItemAdded, Some(snapshot)) => format_portfolio(&snapshot),
            _ => describe_lifecycle(update),
        }
    }

    fn describe_activity(&mut self, update: &ChannelUpdate) -> String {
        let activity = match (update, self.activity.items().latest()) {
            (ChannelUpdate::ItemAdded, Some(activity)) => activity.clone(),
            _ => return describe_lifecycle(update),
        };

        let mut line = format!(
            "{}: {}",
            activity.agent.as_deref().unwrap_or("agent"),
            activity.message.as_deref().unwrap_or("")
        );
        if let Some(raw) = activity.stage.as_deref() {
            let label = classify(raw);
            if !label.recognized {
                stream_warn!("Unrecognized stage label {:?}; treating as starting", raw);
            }
            let state = self.run.observe(label.stage, false);
            line.push_str(&format!(" | stage {} {}", label.stage, format_progress(&state)));
        }
        line
    }
}

/// Runs the monitor until Ctrl-C.
pub async fn run(config: MonitorConfig) -> anyhow::Result<()> {
    let mut monitor = Monitor::new(&config)?;
    monitor.run_until(ctrl_c()).await;
    Ok(())
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        stream_error!("Could not listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn describe_lifecycle(update: &ChannelUpdate) -> String {
    match update {
        ChannelUpdate::Connecting {
            attempt,
            delay: Some(delay),
        } => format!("reconnecting in {delay:?} (attempt {attempt})"),
        ChannelUpdate::Connecting { .. } => "connecting".to_string(),
        ChannelUpdate::Connected => "connected".to_string(),
        ChannelUpdate::ItemAdded => "item added".to_string(),
        ChannelUpdate::ServerError(error) => error.to_string(),
        ChannelUpdate::Disconnected(error) => format!("disconnected: {error}"),
        ChannelUpdate::Closed => "closed by server".to_string(),
    }
}

pub fn format_signal(signal: &Signal) -> String {
    let mut line = format!(
        "{} {}",
        signal.action.as_deref().unwrap_or("?"),
        signal.symbol.as_deref().unwrap_or("?")
    );
    if let Some(confidence) = signal.confidence {
        line.push_str(&format!(" (confidence {confidence:.2})"));
    }
    line
}

pub fn format_trade(trade: &Trade) -> String {
    let mut line = format!(
        "{} {}",
        trade.side.as_deref().unwrap_or("?"),
        trade.symbol.as_deref().unwrap_or("?")
    );
    if let Some(quantity) = trade.quantity {
        line.push_str(&format!(" x{quantity}"));
    }
    if let Some(price) = trade.price {
        line.push_str(&format!(" @ {price:.2}"));
    }
    line
}

pub fn format_portfolio(snapshot: &PortfolioSnapshot) -> String {
    let value = snapshot
        .total_value
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| "?".to_string());
    let mut line = format!("value {value}, {} positions", snapshot.position_count());
    if let Some(cash) = snapshot.cash {
        line.push_str(&format!(", cash {cash:.2}"));
    }
    line
}

/// `"50% [x x > . .]"`: percent followed by one mark per running stage.
pub fn format_progress(state: &ProgressState) -> String {
    let marks: Vec<&str> = stage_steps(state)
        .iter()
        .map(|step| match step.status {
            StepStatus::Done => "x",
            StepStatus::Active => ">",
            StepStatus::Pending => ".",
            StepStatus::Failed => "!",
        })
        .collect();
    let mut line = format!("{}% [{}]", state.percent, marks.join(" "));
    if state.is_error {
        line.push_str(" failed");
    } else if state.is_terminal && state.percent < 100 {
        line.push_str(" cancelled");
    }
    line
}

