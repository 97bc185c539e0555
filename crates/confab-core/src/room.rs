//! Conversation rooms: ephemeral routing labels for user pairs.
//!
//! A room is never persisted; it exists only as membership entries in the
//! [`RoomRouter`] tables. The key is canonical for the unordered pair, so
//! both participants compute the same room no matter who opened the chat.

use dashmap::DashMap;

use std::collections::HashSet;
use std::fmt;

use confab_types::user::UserId;

use crate::connection::ConnectionId;

/// Canonical room identifier for an unordered pair of users.
///
/// The two ids are sorted lexicographically and joined with `:`, which
/// cannot appear inside a UUID, so distinct pairs never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomKey(String);

impl RoomKey {
    /// Compute the canonical key for a pair. Symmetric:
    /// `for_pair(a, b) == for_pair(b, a)`.
    pub fn for_pair(a: UserId, b: UserId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{lo}:{hi}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Membership tables mapping rooms to subscribed connections.
///
/// Both directions are kept: room -> connections for fan-out, and
/// connection -> rooms so disconnect teardown is proportional to the
/// connection's own subscriptions. All operations are non-suspending;
/// entry locks are held only for the map mutation itself.
#[derive(Debug, Default)]
pub struct RoomRouter {
    members: DashMap<RoomKey, HashSet<ConnectionId>>,
    joined: DashMap<ConnectionId, HashSet<RoomKey>>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a room. Joining twice is a no-op.
    pub fn join(&self, connection: ConnectionId, room: RoomKey) {
        self.members
            .entry(room.clone())
            .or_default()
            .insert(connection);
        self.joined.entry(connection).or_default().insert(room);
    }

    /// Unsubscribe a connection from a room. Leaving a room the
    /// connection never joined is a no-op.
    pub fn leave(&self, connection: ConnectionId, room: &RoomKey) {
        if let Some(mut set) = self.members.get_mut(room) {
            set.remove(&connection);
            if set.is_empty() {
                drop(set);
                self.members.remove_if(room, |_, set| set.is_empty());
            }
        }
        if let Some(mut rooms) = self.joined.get_mut(&connection) {
            rooms.remove(room);
        }
    }

    /// Drop every subscription held by a connection (disconnect teardown).
    pub fn leave_all(&self, connection: ConnectionId) {
        let Some((_, rooms)) = self.joined.remove(&connection) else {
            return;
        };
        for room in rooms {
            if let Some(mut set) = self.members.get_mut(&room) {
                set.remove(&connection);
                if set.is_empty() {
                    drop(set);
                    self.members.remove_if(&room, |_, set| set.is_empty());
                }
            }
        }
    }

    /// Connections currently subscribed to a room.
    pub fn members(&self, room: &RoomKey) -> Vec<ConnectionId> {
        self.members
            .get(room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is subscribed to a room (notification
    /// suppression check).
    pub fn contains(&self, room: &RoomKey, connection: ConnectionId) -> bool {
        self.members
            .get(room)
            .is_some_and(|set| set.contains(&connection))
    }
}
