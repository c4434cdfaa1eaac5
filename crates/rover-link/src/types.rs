//! Shared types for the link and the dispatcher.
//!
//! This module defines:
//! - `ConnectionState`: where a `LinkSession` is in its lifecycle
//! - `LinkEvent`: what the session reports to its single consumer
//! - `Notification`: what the dispatcher publishes to observers
//! - channel aliases and the observer registry

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use rover_core::{Obstacle, ObstacleId, Pose, RunKind};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::RwLock;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Emitted by a `LinkSession`, in the order things happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Bytes from one read, unframed.
    Inbound(Bytes),

    /// The session moved to `state`. `remote_id` is the device involved;
    /// for `Disconnected` it is the one just left.
    StateChanged {
        state: ConnectionState,
        remote_id: Option<String>,
    },
}

/// Channel from the session → dispatcher.
pub type LinkEventTx = mpsc::UnboundedSender<LinkEvent>;
pub type LinkEventRx = mpsc::UnboundedReceiver<LinkEvent>;

/// Published by the dispatcher after each committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Notification {
    PoseChanged(Pose),
    ObstacleChanged {
        id: ObstacleId,
        obstacle: Obstacle,
    },
    ConnectionStateChanged {
        state: ConnectionState,
        remote_id: Option<String>,
    },
    StatusText {
        text: String,
        terminal: bool,
    },
    /// Recognition for this obstacle came back empty; the vehicle retries.
    TargetRetry {
        id: ObstacleId,
    },
    /// Every inbound message, verbatim, before it is decoded.
    Received(String),
    RunStarted(RunKind),
    RunCompleted {
        kind: RunKind,
        elapsed_ms: u64,
    },
    /// An inbound message or a local edit that was dropped, and why.
    Rejected(String),
}

/// Identifier for a subscriber.
///
/// Unique over the lifetime of one dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Notifications from the dispatcher to one subscriber.
pub type NotificationTx = mpsc::UnboundedSender<Notification>;
pub type NotificationRx = mpsc::UnboundedReceiver<Notification>;

/// Registry of subscribers and their channels.
pub type ObserverRegistry = Arc<RwLock<HashMap<SubscriberId, NotificationTx>>>;
