use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a user, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new UserId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A user as seen by the messaging core.
///
/// Account registration and the friend workflow live in an external system
/// that shares the durable store; Confab reads user rows and writes only the
/// presence columns (`is_online`, `last_active`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    /// Presence flag, flipped on every connect/disconnect.
    pub is_online: bool,
    /// Last connect or disconnect time.
    pub last_active: DateTime<Utc>,
}

impl UserProfile {
    /// The identity-enriched form embedded in delivered messages and events.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Minimal user identity carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}

/// Entry in the `onlineUsers` snapshot reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub id: UserId,
    pub username: String,
    pub is_online: bool,
}

impl From<UserSummary> for OnlineUser {
    fn from(summary: UserSummary) -> Self {
        Self {
            id: summary.id,
            username: summary.username,
            is_online: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_user_ids_are_time_sortable() {
        let a = UserId::new();
        let b = UserId::new();
        assert!(a <= b);
    }

    #[test]
    fn test_online_user_wire_format() {
        let user = OnlineUser {
            id: UserId::new(),
            username: "ada".to_string(),
            is_online: true,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"isOnline\":true"));
        assert!(json.contains("\"username\":\"ada\""));
    }

    #[test]
    fn test_summary_from_profile() {
        let profile = UserProfile {
            id: UserId::new(),
            username: "grace".to_string(),
            is_online: false,
            last_active: Utc::now(),
        };
        let summary = profile.summary();
        assert_eq!(summary.id, profile.id);
        assert_eq!(summary.username, "grace");
    }
}
