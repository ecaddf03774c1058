//! Stream core: pure channel state, event routing and analysis progress.
mod backoff;
mod channel;
mod connection;
mod event;
mod history;
pub mod payload;
mod progress;
mod router;
mod stage;
mod view_model;

pub use backoff::BackoffPolicy;
pub use channel::{ChannelError, ChannelMsg, ChannelState, ChannelUpdate, ListView, SnapshotView};
pub use connection::{
    ConnectionState, ConnectorEffect, ConnectorMachine, ConnectorMsg, LifecycleEvent,
};
pub use event::{decode_envelope, DecodeError, Envelope, EventKind};
pub use history::{HistoryBuffer, DEFAULT_MAX_ITEMS};
pub use progress::{progress, progress_for_label, ProgressState, RunProgress};
pub use router::{route_frame, Routed};
pub use stage::{classify, normalize, AnalysisStage, StageLabel};
pub use view_model::{stage_steps, StageStep, StepStatus};
