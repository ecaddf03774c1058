//! Stream engine: SSE transport, reconnecting connectors and domain channels.
mod channel;
mod channels;
mod config;
mod connector;
mod sse;
mod transport;
mod types;

pub use channel::{ChannelSpec, Retention, StreamChannel};
pub use channels::{
    AgentActivityChannel, AgentActivityFeed, PortfolioChannel, PortfolioUpdates, SignalChannel,
    Signals, TradeChannel, Trades,
};
pub use config::{build_endpoint, ChannelOptions, ConfigError, StreamSettings, API_ORIGIN_ENV};
pub use connector::{ConnectorEvent, ConnectorSettings, StreamConnector};
pub use sse::{SseDecoder, SseFrame};
pub use transport::{
    frames_from_bytes, FrameStream, OpenRequest, ReqwestTransport, StreamItem, Transport,
    EVENT_STREAM,
};
pub use types::{TransportError, TransportFailure};
