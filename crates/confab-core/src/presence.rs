//! Presence broadcasting: online/offline transitions and the snapshot query.
//!
//! Broadcasts are fire-and-forget; a failed send to one connection never
//! affects delivery to the others (the per-connection outbox isolates it).

use std::sync::Arc;

use confab_types::event::ServerEvent;
use confab_types::user::OnlineUser;

use crate::connection::ConnectionHandle;
use crate::registry::ConnectionRegistry;
use crate::repository::DirectoryRepository;

/// Announces connect/disconnect transitions and answers `getOnlineUsers`.
pub struct PresenceBroadcaster<D> {
    registry: Arc<ConnectionRegistry<D>>,
}

impl<D> PresenceBroadcaster<D>
where
    D: DirectoryRepository + 'static,
{
    pub fn new(registry: Arc<ConnectionRegistry<D>>) -> Self {
        Self { registry }
    }

    /// Tell every other live connection this user came online.
    pub fn announce_online(&self, connection: &ConnectionHandle) {
        self.registry.broadcast_except(
            connection.id(),
            &ServerEvent::UserOnline {
                user_id: connection.user_id(),
                username: connection.username().to_string(),
            },
        );
    }

    /// Tell every other live connection this user went offline.
    ///
    /// Called exactly once per disconnect, after the registry entry is gone.
    pub fn announce_offline(&self, connection: &ConnectionHandle) {
        self.registry.broadcast_except(
            connection.id(),
            &ServerEvent::UserOffline {
                user_id: connection.user_id(),
                username: connection.username().to_string(),
            },
        );
    }

    /// Synchronous snapshot reply for one requesting connection.
    ///
    /// Excludes the requester; every listed user is online by definition.
    pub fn online_users(&self, requester: &ConnectionHandle) -> ServerEvent {
        let users: Vec<OnlineUser> = self
            .registry
            .online_snapshot()
            .into_iter()
            .filter(|user| user.id != requester.user_id())
            .map(OnlineUser::from)
            .collect();
        ServerEvent::OnlineUsers { users }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryDirectory;
    use chrono::Utc;
    use confab_types::user::{UserId, UserProfile};
    use tokio::sync::mpsc::error::TryRecvError;

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(),
            username: name.to_string(),
            is_online: false,
            last_active: Utc::now(),
        }
    }

    fn setup() -> (
        Arc<ConnectionRegistry<MemoryDirectory>>,
        PresenceBroadcaster<MemoryDirectory>,
    ) {
        let registry = Arc::new(ConnectionRegistry::new(Arc::new(MemoryDirectory::new())));
        let broadcaster = PresenceBroadcaster::new(Arc::clone(&registry));
        (registry, broadcaster)
    }

    #[tokio::test]
    async fn online_announcement_reaches_only_other_connections() {
        let (registry, broadcaster) = setup();
        let (conn_a, mut rx_a) = ConnectionHandle::new(profile("ada").summary());
        let (conn_b, mut rx_b) = ConnectionHandle::new(profile("bob").summary());
        registry.register(conn_a.clone());
        registry.register(conn_b);

        broadcaster.announce_online(&conn_a);

        match rx_b.try_recv().unwrap() {
            ServerEvent::UserOnline { username, .. } => assert_eq!(username, "ada"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(rx_a.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn offline_announcement_is_delivered_exactly_once() {
        let (registry, broadcaster) = setup();
        let (conn_a, _rx_a) = ConnectionHandle::new(profile("ada").summary());
        let (conn_b, mut rx_b) = ConnectionHandle::new(profile("bob").summary());
        registry.register(conn_a.clone());
        registry.register(conn_b);

        registry.unregister(conn_a.id());
        broadcaster.announce_offline(&conn_a);

        assert!(matches!(
            rx_b.try_recv().unwrap(),
            ServerEvent::UserOffline { .. }
        ));
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn snapshot_excludes_the_requester() {
        let (registry, broadcaster) = setup();
        let (conn_a, _rx_a) = ConnectionHandle::new(profile("ada").summary());
        let (conn_b, _rx_b) = ConnectionHandle::new(profile("bob").summary());
        registry.register(conn_a.clone());
        registry.register(conn_b);

        let ServerEvent::OnlineUsers { users } = broadcaster.online_users(&conn_a) else {
            panic!("expected onlineUsers");
        };
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "bob");
        assert!(users[0].is_online);
    }

    #[tokio::test]
    async fn closed_peer_does_not_disturb_other_deliveries() {
        let (registry, broadcaster) = setup();
        let (conn_a, _rx_a) = ConnectionHandle::new(profile("ada").summary());
        let (conn_b, rx_b) = ConnectionHandle::new(profile("bob").summary());
        let (conn_c, mut rx_c) = ConnectionHandle::new(profile("eve").summary());
        registry.register(conn_a.clone());
        registry.register(conn_b);
        registry.register(conn_c);

        // Bob's socket task is gone but the registry entry is still there.
        drop(rx_b);

        broadcaster.announce_online(&conn_a);
        assert!(matches!(
            rx_c.try_recv().unwrap(),
            ServerEvent::UserOnline { .. }
        ));
    }
}
