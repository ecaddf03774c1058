use std::time::Duration;

use crate::connection::{ConnectionState, LifecycleEvent};
use crate::HistoryBuffer;

/// Non-fatal error surfaced through a channel's `error` output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server error: {0}")]
    Server(String),
}

/// Input applied to a [`ChannelState`]: one per inbound connector event.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMsg<T> {
    Lifecycle(LifecycleEvent),
    Item(T),
    ServerError(ChannelError),
}

/// What a single applied message changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelUpdate {
    Connecting {
        attempt: u32,
        delay: Option<Duration>,
    },
    Connected,
    ItemAdded,
    ServerError(ChannelError),
    Disconnected(ChannelError),
    Closed,
}

/// Output contract for list channels.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub items: HistoryBuffer<T>,
    pub is_connected: bool,
    pub error: Option<ChannelError>,
}

/// Output contract for the single-latest-snapshot channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotView<T> {
    pub data: Option<T>,
    pub is_connected: bool,
    pub error: Option<ChannelError>,
}

/// State behind one channel: its history, connection state and last error.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState<T> {
    history: HistoryBuffer<T>,
    connection: ConnectionState,
    error: Option<ChannelError>,
}

impl<T> ChannelState<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::with_capacity(capacity),
            connection: ConnectionState::Idle,
            error: None,
        }
    }

    pub fn history(&self) -> &HistoryBuffer<T> {
        &self.history
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }

    pub fn error(&self) -> Option<&ChannelError> {
        self.error.as_ref()
    }

    /// Drops all history, e.g. when the subscription target changes.
    pub fn reset_history(&mut self) {
        self.history = self.history.clear();
    }

    /// Records that the owner tore the connector down.
    pub fn mark_released(&mut self) {
        if self.connection != ConnectionState::Idle {
            self.connection = ConnectionState::Closed;
        }
    }
}

impl<T: Clone> ChannelState<T> {
    pub fn apply(&mut self, msg: ChannelMsg<T>) -> ChannelUpdate {
        match msg {
            ChannelMsg::Lifecycle(event) => {
                self.connection = self.connection.observe(&event);
                match event {
                    LifecycleEvent::Connecting { attempt, delay } => {
                        ChannelUpdate::Connecting { attempt, delay }
                    }
                    LifecycleEvent::Opened => {
                        self.error = None;
                        ChannelUpdate::Connected
                    }
                    LifecycleEvent::Failed(error) => {
                        self.error = Some(error.clone());
                        ChannelUpdate::Disconnected(error)
                    }
                    LifecycleEvent::Closed => ChannelUpdate::Closed,
                }
            }
            ChannelMsg::Item(item) => {
                self.history = self.history.push(item);
                ChannelUpdate::ItemAdded
            }
            ChannelMsg::ServerError(error) => {
                self.error = Some(error.clone());
                ChannelUpdate::ServerError(error)
            }
        }
    }

    pub fn view(&self) -> ListView<T> {
        ListView {
            items: self.history.clone(),
            is_connected: self.is_connected(),
            error: self.error.clone(),
        }
    }

    pub fn snapshot(&self) -> SnapshotView<T> {
        SnapshotView {
            data: self.history.latest().cloned(),
            is_connected: self.is_connected(),
            error: self.error.clone(),
        }
    }
}
