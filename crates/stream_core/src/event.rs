use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Event tags the backend pushes. Tags this client does not know are kept
/// verbatim so they can be logged and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Signal,
    Trade,
    PortfolioUpdate,
    AgentActivity,
    Error,
    Other(String),
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "signal" => EventKind::Signal,
            "trade" => EventKind::Trade,
            "portfolio_update" => EventKind::PortfolioUpdate,
            "agent_activity" => EventKind::AgentActivity,
            "error" => EventKind::Error,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            EventKind::Signal => "signal",
            EventKind::Trade => "trade",
            EventKind::PortfolioUpdate => "portfolio_update",
            EventKind::AgentActivity => "agent_activity",
            EventKind::Error => "error",
            EventKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One decoded frame: `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: EventKind,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("frame is not an event envelope: {0}")]
    InvalidEnvelope(String),
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Parses raw frame text into an [`Envelope`]. A missing `data` field decodes
/// as `null`.
pub fn decode_envelope(raw: &str) -> Result<Envelope, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| DecodeError::InvalidJson(err.to_string()))?;
    let envelope: RawEnvelope = serde_json::from_value(value)
        .map_err(|err| DecodeError::InvalidEnvelope(err.to_string()))?;
    Ok(Envelope {
        kind: EventKind::from_tag(&envelope.kind),
        data: envelope.data,
    })
}
