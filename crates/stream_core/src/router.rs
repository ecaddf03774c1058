use serde_json::Value;

use crate::event::{decode_envelope, DecodeError, EventKind};
use crate::ChannelError;

/// Where a single inbound frame should go.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Payload of the subscribed kind, destined for the history.
    Payload(Value),
    /// Backend-reported error; surfaced without touching history.
    ServerError(ChannelError),
    /// A kind this subscriber does not handle.
    Ignored(EventKind),
    /// Undecodable frame; dropped by the caller.
    Malformed(DecodeError),
}

/// Decodes one frame and dispatches it by tag against the subscribed kind.
pub fn route_frame(raw: &str, subscribed: &EventKind) -> Routed {
    let envelope = match decode_envelope(raw) {
        Ok(envelope) => envelope,
        Err(err) => return Routed::Malformed(err),
    };

    match envelope.kind {
        EventKind::Error => Routed::ServerError(ChannelError::Server(error_message(&envelope.data))),
        kind if &kind == subscribed => Routed::Payload(envelope.data),
        kind => Routed::Ignored(kind),
    }
}

fn error_message(data: &Value) -> String {
    match data {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields
            .get("message")
            .or_else(|| fields.get("error"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| data.to_string()),
        Value::Null => "unknown server error".to_string(),
        other => other.to_string(),
    }
}
