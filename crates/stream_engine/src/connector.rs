use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use stream_core::{
    BackoffPolicy, ChannelError, ConnectorEffect, ConnectorMachine, ConnectorMsg, LifecycleEvent,
};
use stream_logging::{stream_debug, stream_info, stream_warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::transport::{FrameStream, OpenRequest, StreamItem, Transport};
use crate::{TransportError, TransportFailure};

/// Everything a connector reports, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEvent {
    Lifecycle(LifecycleEvent),
    /// Raw frame payload, undecoded.
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorSettings {
    pub backoff: BackoffPolicy,
    pub connect_timeout: Duration,
    /// Treat the stream as dead when nothing arrives for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: None,
        }
    }
}

/// Owns one push subscription and its reconnect loop.
///
/// The subscription runs as a task on the given runtime. [`disconnect`]
/// cancels it and drops the event queue before returning, so nothing is
/// observable through [`next_event`] afterwards; pending backoff timers die
/// with the task.
///
/// [`disconnect`]: StreamConnector::disconnect
/// [`next_event`]: StreamConnector::next_event
pub struct StreamConnector {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    settings: ConnectorSettings,
    runtime: Handle,
    session: Option<Session>,
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<ConnectorEvent>,
}

impl StreamConnector {
    pub fn new(
        endpoint: Url,
        transport: Arc<dyn Transport>,
        settings: ConnectorSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            endpoint,
            transport,
            settings,
            runtime,
            session: None,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Starts the subscription. No-op while already connected.
    pub fn connect(&mut self) {
        if self.session.is_some() {
            return;
        }

        let (events_tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker = SessionWorker {
            endpoint: self.endpoint.clone(),
            transport: self.transport.clone(),
            settings: self.settings,
            events: events_tx,
            cancel: cancel.clone(),
            last_event_id: None,
        };
        let task = self.runtime.spawn(worker.run());
        stream_debug!("connector started for {}", self.endpoint);

        self.session = Some(Session {
            cancel,
            task,
            events,
        });
    }

    /// Tears the subscription down. Safe to call repeatedly or before
    /// [`connect`](StreamConnector::connect).
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            session.task.abort();
            drop(session.events);
            stream_info!("disconnected from {}", self.endpoint);
        }
    }

    /// Waits for the next event. Returns `None` when not connected.
    pub async fn next_event(&mut self) -> Option<ConnectorEvent> {
        match self.session.as_mut() {
            Some(session) => session.events.recv().await,
            None => None,
        }
    }

    pub fn try_next_event(&mut self) -> Option<ConnectorEvent> {
        self.session.as_mut()?.events.try_recv().ok()
    }
}

impl Drop for StreamConnector {
    fn drop(&mut self) {
        self.disconnect();
    }
}

enum Step {
    Open,
    Wait(Duration),
}

enum Opening {
    Opened(FrameStream),
    Failed(ChannelError),
    Cancelled,
}

struct SessionWorker {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    settings: ConnectorSettings,
    events: mpsc::UnboundedSender<ConnectorEvent>,
    cancel: CancellationToken,
    last_event_id: Option<String>,
}

impl SessionWorker {
    async fn run(mut self) {
        let mut machine = ConnectorMachine::new(self.settings.backoff);
        let mut effects = machine.handle(ConnectorMsg::Connect);

        loop {
            let Some(step) = self.apply(effects) else {
                return;
            };

            let msg = match step {
                Step::Wait(delay) => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => ConnectorMsg::RetryDue,
                    }
                }
                Step::Open => match self.open().await {
                    Opening::Cancelled => return,
                    Opening::Failed(error) => ConnectorMsg::Failed(error),
                    Opening::Opened(frames) => {
                        self.apply(machine.handle(ConnectorMsg::Opened));
                        if self.is_released() {
                            return;
                        }
                        match self.pump(frames).await {
                            Some(msg) => msg,
                            None => return,
                        }
                    }
                },
            };

            effects = machine.handle(msg);
        }
    }

    /// Reports notifications and returns the I/O step to take next, if any.
    fn apply(&self, effects: Vec<ConnectorEffect>) -> Option<Step> {
        let mut step = None;
        for effect in effects {
            match effect {
                ConnectorEffect::Notify(event) => {
                    self.log_lifecycle(&event);
                    if !self.emit(ConnectorEvent::Lifecycle(event)) {
                        return None;
                    }
                }
                ConnectorEffect::OpenTransport => step = Some(Step::Open),
                ConnectorEffect::ScheduleRetry(delay) => step = Some(Step::Wait(delay)),
                ConnectorEffect::Stop => return None,
            }
        }
        step
    }

    async fn open(&self) -> Opening {
        let request = OpenRequest {
            url: &self.endpoint,
            last_event_id: self.last_event_id.as_deref(),
        };
        let attempt = tokio::time::timeout(self.settings.connect_timeout, self.transport.open(request));

        tokio::select! {
            _ = self.cancel.cancelled() => Opening::Cancelled,
            result = attempt => match result {
                Ok(Ok(frames)) => Opening::Opened(frames),
                Ok(Err(err)) => Opening::Failed(transport_error(err)),
                Err(_) => Opening::Failed(transport_error(TransportError::new(
                    TransportFailure::Timeout,
                    format!("no response within {:?}", self.settings.connect_timeout),
                ))),
            },
        }
    }

    /// Forwards frames until the stream fails or ends. Any received bytes,
    /// keepalive comments included, restart the idle timer. `None` means the
    /// session was released.
    async fn pump(&mut self, mut frames: FrameStream) -> Option<ConnectorMsg> {
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                next = next_frame(&mut frames, self.settings.idle_timeout) => next,
            };

            match next {
                Ok(Some(Ok(StreamItem::KeepAlive))) => continue,
                Ok(Some(Ok(StreamItem::Frame(frame)))) => {
                    self.last_event_id = frame.id;
                    if frame.data.is_empty() {
                        continue;
                    }
                    if !self.emit(ConnectorEvent::Message(frame.data)) {
                        return None;
                    }
                }
                Ok(Some(Err(err))) => return Some(ConnectorMsg::Failed(transport_error(err))),
                Ok(None) => return Some(ConnectorMsg::Ended),
                Err(_) => {
                    return Some(ConnectorMsg::Failed(transport_error(TransportError::new(
                        TransportFailure::IdleTimeout,
                        "no data received",
                    ))))
                }
            }
        }
    }

    fn emit(&self, event: ConnectorEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.events.send(event).is_ok()
    }

    fn is_released(&self) -> bool {
        self.cancel.is_cancelled() || self.events.is_closed()
    }

    fn log_lifecycle(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Connecting {
                attempt,
                delay: Some(delay),
            } => stream_info!(
                "reconnecting to {} in {:?} (attempt {})",
                self.endpoint,
                delay,
                attempt
            ),
            LifecycleEvent::Connecting { .. } => {
                stream_debug!("connecting to {}", self.endpoint)
            }
            LifecycleEvent::Opened => stream_info!("stream open: {}", self.endpoint),
            LifecycleEvent::Failed(error) => {
                stream_warn!("stream {} failed: {}", self.endpoint, error)
            }
            LifecycleEvent::Closed => stream_info!("stream {} closed by server", self.endpoint),
        }
    }
}

async fn next_frame(
    frames: &mut FrameStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<Result<StreamItem, TransportError>>, Elapsed> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, frames.next()).await,
        None => Ok(frames.next().await),
    }
}

fn transport_error(err: TransportError) -> ChannelError {
    ChannelError::Transport(err.to_string())
}
