use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportFailure,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Connect,
    Timeout,
    HttpStatus(u16),
    UnsupportedContentType { content_type: String },
    IdleTimeout,
    Network,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Connect => write!(f, "connect failed"),
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::HttpStatus(code) => write!(f, "http status {code}"),
            TransportFailure::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            TransportFailure::IdleTimeout => write!(f, "stream idle timeout"),
            TransportFailure::Network => write!(f, "network error"),
        }
    }
}
