use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use url::Url;

use crate::sse::{SseDecoder, SseFrame};
use crate::{TransportError, TransportFailure};

pub const EVENT_STREAM: &str = "text/event-stream";
const LAST_EVENT_ID: &str = "Last-Event-ID";

/// Items of one open subscription, in arrival order. The stream ends when
/// the server closes the connection.
pub type FrameStream = BoxStream<'static, Result<StreamItem, TransportError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Frame(SseFrame),
    /// Bytes arrived but completed no frame, e.g. a `: ping` comment.
    KeepAlive,
}

#[derive(Debug, Clone, Copy)]
pub struct OpenRequest<'a> {
    pub url: &'a Url,
    /// Id of the last frame received on a previous connection, if any.
    pub last_event_id: Option<&'a str>,
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: OpenRequest<'_>) -> Result<FrameStream, TransportError>;
}

/// HTTP transport. One client, and so one connection pool, serves every
/// attempt made through this transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    // No overall request timeout: the response body is a long-lived stream.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| TransportError::new(TransportFailure::Network, err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, request: OpenRequest<'_>) -> Result<FrameStream, TransportError> {
        let mut builder = self
            .client
            .get(request.url.clone())
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = request.last_event_id {
            builder = builder.header(LAST_EVENT_ID, id);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        if let Some(ct) = content_type.as_deref() {
            if !is_event_stream(ct) {
                return Err(TransportError::new(
                    TransportFailure::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "expected an event stream",
                ));
            }
        }

        let resume_id = request.last_event_id.map(str::to_owned);
        Ok(frames_from_bytes(
            response.bytes_stream(),
            resume_id,
            map_reqwest_error,
        ))
    }
}

/// Decodes a byte stream into SSE frames. `last_event_id` is the id the
/// connection resumed from; frames carry it until the server sends another.
/// A chunk that completes no frame yields [`StreamItem::KeepAlive`].
pub fn frames_from_bytes<S, E>(
    bytes: S,
    last_event_id: Option<String>,
    map_err: fn(E) -> TransportError,
) -> FrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    let decoder = SseDecoder::resuming(last_event_id);
    let state = (Box::pin(bytes), decoder, VecDeque::new());
    stream::unfold(state, move |(mut bytes, mut decoder, mut pending)| async move {
        loop {
            if let Some(frame) = pending.pop_front() {
                return Some((Ok(StreamItem::Frame(frame)), (bytes, decoder, pending)));
            }
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    let frames = decoder.feed(&chunk);
                    if frames.is_empty() {
                        return Some((Ok(StreamItem::KeepAlive), (bytes, decoder, pending)));
                    }
                    pending.extend(frames);
                }
                Some(Err(err)) => return Some((Err(map_err(err)), (bytes, decoder, pending))),
                None => return None,
            }
        }
    })
    .boxed()
}

fn is_event_stream(content_type: &str) -> bool {
    let ct = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    ct.eq_ignore_ascii_case(EVENT_STREAM)
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportFailure::Timeout, err.to_string());
    }
    if err.is_connect() {
        return TransportError::new(TransportFailure::Connect, err.to_string());
    }
    TransportError::new(TransportFailure::Network, err.to_string())
}
