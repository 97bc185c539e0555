//! Live connection handles.
//!
//! A [`ConnectionHandle`] is the registry-side view of one authenticated
//! WebSocket session: the owning user, an unbounded outbox the socket task
//! drains, and a cancellation token used to force-close the socket from
//! outside (duplicate login eviction, shutdown). The socket itself is owned
//! by its task in `confab-api`; everything here is cheap to clone.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use std::fmt;

use confab_types::event::ServerEvent;
use confab_types::user::{UserId, UserSummary};

/// Unique identifier for one live connection, wrapping a UUID v7.
///
/// Distinct from [`UserId`]: when a user reconnects, the replacement
/// connection gets a fresh id, which is what lets teardown of the old
/// connection recognize it has been evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new ConnectionId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-side handle to a live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    user: UserSummary,
    outbox: mpsc::UnboundedSender<ServerEvent>,
    cancel: CancellationToken,
    connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiving half of its outbox.
    ///
    /// The receiver goes to the socket task; the handle goes to the
    /// registry and to every component that may deliver events.
    pub fn new(user: UserSummary) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            user,
            outbox: tx,
            cancel: CancellationToken::new(),
            connected_at: Utc::now(),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user(&self) -> &UserSummary {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue an event for delivery on this connection.
    ///
    /// Never blocks. Returns false when the socket task is gone; callers
    /// treat that as an isolated per-connection failure, not an error.
    pub fn send(&self, event: ServerEvent) -> bool {
        match self.outbox.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(connection_id = %self.id, user = %self.user.username,
                    "dropped event for closed connection");
                false
            }
        }
    }

    /// Ask the owning socket task to close the connection.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// The force-close token, for the socket task's select loop.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
