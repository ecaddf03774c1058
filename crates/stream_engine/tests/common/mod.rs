#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{stream, StreamExt};
use stream_engine::{
    ChannelSpec, FrameStream, OpenRequest, SseFrame, StreamChannel, StreamItem, StreamSettings,
    Transport, TransportError, TransportFailure,
};
use stream_core::ChannelUpdate;
use tokio::sync::mpsc;

pub const ORIGIN: &str = "http://dashboard.test";

pub fn settings() -> StreamSettings {
    StreamSettings {
        api_origin: Some(ORIGIN.to_string()),
        ..StreamSettings::default()
    }
}

enum Attempt {
    Refuse(TransportError),
    Stream(mpsc::UnboundedReceiver<Result<StreamItem, TransportError>>),
}

/// Transport whose connection attempts are scripted in advance. Once the
/// script runs out, further attempts hang.
#[derive(Default)]
pub struct ScriptedTransport {
    attempts: Mutex<VecDeque<Attempt>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refuse(&self, message: &str) {
        self.attempts
            .lock()
            .unwrap()
            .push_back(Attempt::Refuse(TransportError::new(
                TransportFailure::Connect,
                message,
            )));
    }

    /// Queues a successful attempt and returns the handle feeding it.
    pub fn stream(&self) -> FrameFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attempts.lock().unwrap().push_back(Attempt::Stream(rx));
        FrameFeed {
            tx,
            last_id: Mutex::new(None),
        }
    }

    pub fn open_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn last_event_ids(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: OpenRequest<'_>) -> Result<FrameStream, TransportError> {
        self.requests.lock().unwrap().push((
            request.url.to_string(),
            request.last_event_id.map(str::to_owned),
        ));
        let attempt = self.attempts.lock().unwrap().pop_front();
        match attempt {
            Some(Attempt::Refuse(err)) => Err(err),
            Some(Attempt::Stream(rx)) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
            None => futures_util::future::pending().await,
        }
    }
}

/// Server side of one scripted connection. Dropping it ends the stream.
/// Like a decoded byte stream, frames carry the last id sent until another
/// one replaces it.
pub struct FrameFeed {
    tx: mpsc::UnboundedSender<Result<StreamItem, TransportError>>,
    last_id: Mutex<Option<String>>,
}

impl FrameFeed {
    pub fn send(&self, data: &str) {
        let id = self.last_id.lock().unwrap().clone();
        self.push(data, id);
    }

    pub fn send_with_id(&self, data: &str, id: &str) {
        self.push(data, Some(id.to_string()));
    }

    /// A frame with an empty `id:` line, which clears the last id.
    pub fn send_clearing_id(&self, data: &str) {
        self.push(data, None);
    }

    /// Bytes that complete no frame, such as a `: ping` comment.
    pub fn ping(&self) {
        let _ = self.tx.send(Ok(StreamItem::KeepAlive));
    }

    fn push(&self, data: &str, id: Option<String>) {
        *self.last_id.lock().unwrap() = id.clone();
        let _ = self.tx.send(Ok(StreamItem::Frame(SseFrame {
            data: data.to_string(),
            id,
            ..SseFrame::default()
        })));
    }

    pub fn fail(&self, message: &str) {
        let _ = self
            .tx
            .send(Err(TransportError::new(TransportFailure::Network, message)));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Yields until the client side of this connection has been dropped.
    pub async fn wait_closed(&self) -> bool {
        for _ in 0..100 {
            if self.is_closed() {
                return true;
            }
            tokio::task::yield_now().await;
        }
        self.is_closed()
    }
}

pub async fn next<S: ChannelSpec>(channel: &mut StreamChannel<S>) -> ChannelUpdate {
    tokio::time::timeout(Duration::from_secs(600), channel.next_update())
        .await
        .expect("update before timeout")
        .expect("channel mounted")
}

/// Lets spawned connector tasks run until they block.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
