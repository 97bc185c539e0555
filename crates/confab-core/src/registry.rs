//! Connection registry: the single source of truth for who is online.
//!
//! One live connection per user. Registration and teardown are plain map
//! operations behind one lock, never suspending; the presence-record write
//! that accompanies them is spawned fire-and-forget so a slow or down store
//! can never stall the connection lifecycle.
//!
//! Duplicate login policy: a second login from the same user replaces the
//! registry entry and the previous connection is force-closed through its
//! cancellation token. Teardown is keyed by connection id, so the evicted
//! connection's own disconnect cannot remove its replacement.

use chrono::Utc;
use tracing::warn;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use confab_types::event::ServerEvent;
use confab_types::user::{UserId, UserSummary};

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::repository::DirectoryRepository;

#[derive(Debug, Default)]
struct RegistryInner {
    by_user: HashMap<UserId, ConnectionHandle>,
    owner: HashMap<ConnectionId, UserId>,
}

/// Maps each live user to exactly one connection handle.
///
/// A single `RwLock` guards both indexes so every read is a consistent
/// point-in-time view; critical sections contain only map operations.
pub struct ConnectionRegistry<D> {
    inner: RwLock<RegistryInner>,
    directory: Arc<D>,
}

impl<D> ConnectionRegistry<D>
where
    D: DirectoryRepository + 'static,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            directory,
        }
    }

    /// Register a freshly authenticated connection.
    ///
    /// Returns the replaced handle when the user was already connected;
    /// the replaced connection has been asked to close by the time this
    /// returns. Marks the user's presence record online (fire-and-forget).
    pub fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let user_id = handle.user_id();
        let previous = {
            let mut inner = self.inner.write().expect("connection registry lock poisoned");
            inner.owner.insert(handle.id(), user_id);
            let previous = inner.by_user.insert(user_id, handle);
            if let Some(prev) = &previous {
                inner.owner.remove(&prev.id());
            }
            previous
        };

        if let Some(prev) = &previous {
            warn!(user_id = %user_id, evicted = %prev.id(),
                "duplicate login, force-closing previous connection");
            prev.close();
        }

        self.spawn_presence_write(user_id, true);
        previous
    }

    /// Remove a connection on disconnect.
    ///
    /// A no-op when the connection was already evicted by a duplicate
    /// login (its registry entry belongs to the replacement by then).
    /// Marks the user's presence record offline when an entry was removed.
    pub fn unregister(&self, connection: ConnectionId) -> Option<ConnectionHandle> {
        let removed = {
            let mut inner = self.inner.write().expect("connection registry lock poisoned");
            let user_id = inner.owner.remove(&connection)?;
            inner.by_user.remove(&user_id)
        };

        if let Some(handle) = &removed {
            self.spawn_presence_write(handle.user_id(), false);
        }
        removed
    }

    /// The live connection for a user, if any.
    pub fn lookup(&self, user: UserId) -> Option<ConnectionHandle> {
        self.inner
            .read()
            .expect("connection registry lock poisoned")
            .by_user
            .get(&user)
            .cloned()
    }

    /// The live connection with a given connection id, if any.
    pub fn lookup_connection(&self, connection: ConnectionId) -> Option<ConnectionHandle> {
        let inner = self.inner.read().expect("connection registry lock poisoned");
        let user_id = inner.owner.get(&connection)?;
        inner.by_user.get(user_id).cloned()
    }

    /// Consistent point-in-time snapshot of every online user.
    pub fn online_snapshot(&self) -> Vec<UserSummary> {
        self.inner
            .read()
            .expect("connection registry lock poisoned")
            .by_user
            .values()
            .map(|handle| handle.user().clone())
            .collect()
    }

    /// Queue an event to every live connection except one (broadcasts).
    ///
    /// Handles are cloned out under the read lock; the actual sends happen
    /// outside it. A closed peer is skipped, never an error.
    pub fn broadcast_except(&self, except: ConnectionId, event: &ServerEvent) {
        let targets: Vec<ConnectionHandle> = {
            let inner = self.inner.read().expect("connection registry lock poisoned");
            inner
                .by_user
                .values()
                .filter(|handle| handle.id() != except)
                .cloned()
                .collect()
        };
        for handle in targets {
            handle.send(event.clone());
        }
    }

    /// Best-effort presence write, never awaited on the lifecycle path.
    fn spawn_presence_write(&self, user: UserId, online: bool) {
        let directory = Arc::clone(&self.directory);
        tokio::spawn(async move {
            if let Err(err) = directory.set_presence(user, online, Utc::now()).await {
                warn!(user_id = %user, online, "presence record update failed: {err}");
            }
        });
    }
}
