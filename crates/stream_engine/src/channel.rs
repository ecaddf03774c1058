use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use stream_core::{
    route_frame, ChannelError, ChannelMsg, ChannelState, ChannelUpdate, ConnectionState,
    EventKind, HistoryBuffer, ListView, Routed, SnapshotView,
};
use stream_logging::{stream_debug, stream_info, stream_trace, stream_warn};
use tokio::runtime::Handle;
use url::Url;

use crate::config::{build_endpoint, ChannelOptions, ConfigError, StreamSettings};
use crate::connector::{ConnectorEvent, StreamConnector};
use crate::transport::{ReqwestTransport, Transport};

/// How many items a channel keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Up to `max_items`, newest first.
    History,
    /// Only the most recent item.
    Latest,
}

/// Describes one domain channel: which events it subscribes to and where.
pub trait ChannelSpec: Send + Sync + 'static {
    /// Built from the event's `data`, whatever its shape.
    type Item: From<Value> + Clone + Send + 'static;

    /// Short name used in logs.
    const NAME: &'static str;
    /// Endpoint segment under `/api/stream/`.
    const PATH: &'static str;
    /// Whether a scope id becomes a trailing path segment.
    const SCOPED: bool;
    const RETENTION: Retention;

    fn event_kind() -> EventKind;
}

/// One independently mounted subscription to a domain event stream.
///
/// The channel owns at most one [`StreamConnector`]. Changing `enabled`,
/// the scope or the base URL replaces it, disconnecting the old one first.
/// History survives reconnects and is cleared when the endpoint changes.
/// Dropping the channel (or calling [`dispose`](StreamChannel::dispose))
/// releases the connector; no update is produced afterwards.
pub struct StreamChannel<S: ChannelSpec> {
    options: ChannelOptions,
    settings: StreamSettings,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    endpoint: Url,
    state: ChannelState<S::Item>,
    connector: Option<StreamConnector>,
    _spec: PhantomData<fn() -> S>,
}

impl<S: ChannelSpec> StreamChannel<S> {
    /// Creates the channel over HTTP. Must be called within a tokio runtime.
    pub fn new(options: ChannelOptions, settings: &StreamSettings) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(settings.connect_timeout)
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;
        Self::with_transport(options, settings, Arc::new(transport))
    }

    pub fn with_transport(
        options: ChannelOptions,
        settings: &StreamSettings,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        if options.max_items == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let endpoint = resolve_endpoint::<S>(&options, settings)?;

        let mut channel = Self {
            state: ChannelState::new(capacity::<S>(options.max_items)),
            options,
            settings: settings.clone(),
            transport,
            runtime,
            endpoint,
            connector: None,
            _spec: PhantomData,
        };
        if channel.options.enabled {
            channel.mount();
        }
        Ok(channel)
    }

    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn is_mounted(&self) -> bool {
        self.connector.is_some()
    }

    pub fn connection(&self) -> &ConnectionState {
        self.state.connection()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn error(&self) -> Option<&ChannelError> {
        self.state.error()
    }

    pub fn items(&self) -> &HistoryBuffer<S::Item> {
        self.state.history()
    }

    pub fn view(&self) -> ListView<S::Item> {
        self.state.view()
    }

    pub fn snapshot(&self) -> SnapshotView<S::Item> {
        self.state.snapshot()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.options.enabled == enabled {
            return;
        }
        self.options.enabled = enabled;
        self.unmount();
        if enabled {
            self.mount();
        }
    }

    /// Retargets the channel to another scope. Ignored by unscoped channels.
    pub fn set_scope(&mut self, scope_id: Option<String>) -> Result<(), ConfigError> {
        if self.options.scope_id == scope_id {
            return Ok(());
        }
        if !S::SCOPED {
            stream_debug!("{} channel is unscoped; ignoring scope {:?}", S::NAME, scope_id);
            self.options.scope_id = scope_id;
            return Ok(());
        }
        let options = ChannelOptions {
            scope_id,
            ..self.options.clone()
        };
        self.retarget(options)
    }

    pub fn set_base_url(&mut self, base_url: Option<String>) -> Result<(), ConfigError> {
        if self.options.base_url == base_url {
            return Ok(());
        }
        let options = ChannelOptions {
            base_url,
            ..self.options.clone()
        };
        self.retarget(options)
    }

    /// Releases the connector. Idempotent.
    pub fn dispose(&mut self) {
        self.unmount();
    }

    /// Waits for the next inbound event and applies it. Frames that are not
    /// JSON envelopes or are of another kind are consumed without producing an update.
    /// Returns `None` when the channel is not mounted.
    pub async fn next_update(&mut self) -> Option<ChannelUpdate> {
        loop {
            let event = self.connector.as_mut()?.next_event().await?;
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
    }

    /// Non-blocking [`next_update`](StreamChannel::next_update).
    pub fn try_next_update(&mut self) -> Option<ChannelUpdate> {
        loop {
            let event = self.connector.as_mut()?.try_next_event()?;
            if let Some(update) = self.apply(event) {
                return Some(update);
            }
        }
    }

    fn retarget(&mut self, options: ChannelOptions) -> Result<(), ConfigError> {
        // Validate before touching the live connector.
        let endpoint = resolve_endpoint::<S>(&options, &self.settings)?;
        self.unmount();
        if endpoint != self.endpoint {
            stream_info!("{} channel retargeted to {}", S::NAME, endpoint);
            self.state.reset_history();
        }
        self.endpoint = endpoint;
        self.options = options;
        if self.options.enabled {
            self.mount();
        }
        Ok(())
    }

    fn mount(&mut self) {
        let mut connector = StreamConnector::new(
            self.endpoint.clone(),
            self.transport.clone(),
            self.settings.connector_settings(),
            self.runtime.clone(),
        );
        connector.connect();
        stream_info!("{} channel subscribed to {}", S::NAME, self.endpoint);
        self.connector = Some(connector);
    }

    fn unmount(&mut self) {
        if let Some(mut connector) = self.connector.take() {
            connector.disconnect();
            self.state.mark_released();
        }
    }

    fn apply(&mut self, event: ConnectorEvent) -> Option<ChannelUpdate> {
        let msg = match event {
            ConnectorEvent::Lifecycle(event) => ChannelMsg::Lifecycle(event),
            ConnectorEvent::Message(raw) => self.route(&raw)?,
        };
        Some(self.state.apply(msg))
    }

    fn route(&self, raw: &str) -> Option<ChannelMsg<S::Item>> {
        match route_frame(raw, &S::event_kind()) {
            Routed::Payload(data) => Some(ChannelMsg::Item(S::Item::from(data))),
            Routed::ServerError(error) => {
                stream_warn!("{} channel received {}", S::NAME, error);
                Some(ChannelMsg::ServerError(error))
            }
            Routed::Ignored(kind) => {
                stream_trace!("{} channel ignoring `{}` event", S::NAME, kind);
                None
            }
            Routed::Malformed(err) => {
                stream_warn!("{} channel dropped frame: {}", S::NAME, err);
                None
            }
        }
    }
}

impl<S: ChannelSpec> Drop for StreamChannel<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn resolve_endpoint<S: ChannelSpec>(
    options: &ChannelOptions,
    settings: &StreamSettings,
) -> Result<Url, ConfigError> {
    let base = options
        .base_url
        .as_deref()
        .or(settings.api_origin.as_deref())
        .ok_or(ConfigError::MissingBaseUrl)?;
    let scope = if S::SCOPED {
        options.scope_id.as_deref()
    } else {
        None
    };
    build_endpoint(base, S::PATH, scope)
}

fn capacity<S: ChannelSpec>(max_items: usize) -> usize {
    match S::RETENTION {
        Retention::History => max_items,
        Retention::Latest => 1,
    }
}
