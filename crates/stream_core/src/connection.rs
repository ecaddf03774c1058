use std::time::Duration;

use crate::{BackoffPolicy, ChannelError};

/// Observable state of one push subscription.
///
/// Transitions only follow `Idle -> Connecting -> Open -> {Closed | Errored}
/// -> Connecting -> ...`; a connection is never moved back to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    /// `retry_in` is set while a backoff timer is pending.
    Connecting {
        attempt: u32,
        retry_in: Option<Duration>,
    },
    Open,
    Closed,
    Errored {
        error: ChannelError,
    },
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// State after a lifecycle notification has been observed.
    pub fn observe(&self, event: &LifecycleEvent) -> ConnectionState {
        match event {
            LifecycleEvent::Connecting { attempt, delay } => ConnectionState::Connecting {
                attempt: *attempt,
                retry_in: *delay,
            },
            LifecycleEvent::Opened => ConnectionState::Open,
            LifecycleEvent::Failed(error) => ConnectionState::Errored {
                error: error.clone(),
            },
            LifecycleEvent::Closed => ConnectionState::Closed,
        }
    }
}

/// Notifications a connector reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A connect attempt was started; `delay` is the backoff wait before it,
    /// if any.
    Connecting {
        attempt: u32,
        delay: Option<Duration>,
    },
    Opened,
    Failed(ChannelError),
    /// The server ended the stream without a transport error.
    Closed,
}

/// Inputs driving the connector state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorMsg {
    Connect,
    Opened,
    Failed(ChannelError),
    Ended,
    RetryDue,
    Disconnect,
}

/// Work the I/O side must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorEffect {
    Notify(LifecycleEvent),
    OpenTransport,
    ScheduleRetry(Duration),
    Stop,
}

/// Pure reconnect state machine. The async connector feeds it transport
/// outcomes and executes the effects it returns.
#[derive(Debug, Clone)]
pub struct ConnectorMachine {
    state: ConnectionState,
    policy: BackoffPolicy,
    failures: u32,
}

impl ConnectorMachine {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            failures: 0,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Consecutive failures since the last successful open.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn handle(&mut self, msg: ConnectorMsg) -> Vec<ConnectorEffect> {
        match msg {
            ConnectorMsg::Connect => match self.state {
                ConnectionState::Idle | ConnectionState::Closed => {
                    self.state = ConnectionState::Connecting {
                        attempt: 0,
                        retry_in: None,
                    };
                    vec![
                        ConnectorEffect::Notify(LifecycleEvent::Connecting {
                            attempt: 0,
                            delay: None,
                        }),
                        ConnectorEffect::OpenTransport,
                    ]
                }
                _ => Vec::new(),
            },
            ConnectorMsg::Opened => match self.state {
                ConnectionState::Connecting { retry_in: None, .. } => {
                    self.state = ConnectionState::Open;
                    self.failures = 0;
                    vec![ConnectorEffect::Notify(LifecycleEvent::Opened)]
                }
                _ => Vec::new(),
            },
            ConnectorMsg::Failed(error) => match self.state {
                ConnectionState::Connecting { retry_in: None, .. } | ConnectionState::Open => {
                    self.state = ConnectionState::Errored {
                        error: error.clone(),
                    };
                    self.schedule_retry(LifecycleEvent::Failed(error))
                }
                _ => Vec::new(),
            },
            ConnectorMsg::Ended => match self.state {
                ConnectionState::Open => {
                    self.state = ConnectionState::Closed;
                    self.schedule_retry(LifecycleEvent::Closed)
                }
                ConnectionState::Connecting { retry_in: None, .. } => {
                    let error = ChannelError::Transport("stream ended before opening".into());
                    self.state = ConnectionState::Errored {
                        error: error.clone(),
                    };
                    self.schedule_retry(LifecycleEvent::Failed(error))
                }
                _ => Vec::new(),
            },
            ConnectorMsg::RetryDue => match self.state {
                ConnectionState::Connecting {
                    attempt,
                    retry_in: Some(_),
                } => {
                    self.state = ConnectionState::Connecting {
                        attempt,
                        retry_in: None,
                    };
                    vec![ConnectorEffect::OpenTransport]
                }
                _ => Vec::new(),
            },
            ConnectorMsg::Disconnect => {
                if self.state != ConnectionState::Idle {
                    self.state = ConnectionState::Closed;
                }
                vec![ConnectorEffect::Stop]
            }
        }
    }

    // The errored/closed state is reported, then immediately replaced by the
    // backoff wait.
    fn schedule_retry(&mut self, reported: LifecycleEvent) -> Vec<ConnectorEffect> {
        self.failures = self.failures.saturating_add(1);
        let delay = self.policy.delay_for(self.failures);
        self.state = ConnectionState::Connecting {
            attempt: self.failures,
            retry_in: Some(delay),
        };
        vec![
            ConnectorEffect::Notify(reported),
            ConnectorEffect::Notify(LifecycleEvent::Connecting {
                attempt: self.failures,
                delay: Some(delay),
            }),
            ConnectorEffect::ScheduleRetry(delay),
        ]
    }
}
