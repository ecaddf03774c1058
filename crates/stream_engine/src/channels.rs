//! The four dashboard channels.

use stream_core::payload::{AgentActivity, PortfolioSnapshot, Signal, Trade};
use stream_core::EventKind;

use crate::channel::{ChannelSpec, Retention, StreamChannel};

/// `/api/stream/signals[/:portfolioId]`.
pub struct Signals;

impl ChannelSpec for Signals {
    type Item = Signal;
    const NAME: &'static str = "signals";
    const PATH: &'static str = "signals";
    const SCOPED: bool = true;
    const RETENTION: Retention = Retention::History;

    fn event_kind() -> EventKind {
        EventKind::Signal
    }
}

/// `/api/stream/trades[/:portfolioId]`.
pub struct Trades;

impl ChannelSpec for Trades {
    type Item = Trade;
    const NAME: &'static str = "trades";
    const PATH: &'static str = "trades";
    const SCOPED: bool = true;
    const RETENTION: Retention = Retention::History;

    fn event_kind() -> EventKind {
        EventKind::Trade
    }
}

/// `/api/stream/portfolio[/:portfolioId]`; keeps only the latest snapshot.
pub struct PortfolioUpdates;

impl ChannelSpec for PortfolioUpdates {
    type Item = PortfolioSnapshot;
    const NAME: &'static str = "portfolio";
    const PATH: &'static str = "portfolio";
    const SCOPED: bool = true;
    const RETENTION: Retention = Retention::Latest;

    fn event_kind() -> EventKind {
        EventKind::PortfolioUpdate
    }
}

/// `/api/stream/agent-activity`; not scoped.
pub struct AgentActivityFeed;

impl ChannelSpec for AgentActivityFeed {
    type Item = AgentActivity;
    const NAME: &'static str = "agent-activity";
    const PATH: &'static str = "agent-activity";
    const SCOPED: bool = false;
    const RETENTION: Retention = Retention::History;

    fn event_kind() -> EventKind {
        EventKind::AgentActivity
    }
}

pub type SignalChannel = StreamChannel<Signals>;
pub type TradeChannel = StreamChannel<Trades>;
pub type PortfolioChannel = StreamChannel<PortfolioUpdates>;
pub type AgentActivityChannel = StreamChannel<AgentActivityFeed>;
