//! DirectoryRepository trait definition.
//!
//! Read access to the user directory maintained by the external account
//! system, plus the two presence columns this server owns.

use chrono::{DateTime, Utc};
use confab_types::error::RepositoryError;
use confab_types::user::{UserId, UserProfile};

/// Repository trait for user lookup and presence-record writes.
pub trait DirectoryRepository: Send + Sync {
    /// Resolve a user id to its profile, if the user exists.
    fn find_user(
        &self,
        id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserProfile>, RepositoryError>> + Send;

    /// Update a user's presence record (`is_online`, `last_active`).
    ///
    /// Called fire-and-forget from the connection lifecycle; failures are
    /// logged by the caller and never block register/unregister.
    fn set_presence(
        &self,
        id: UserId,
        online: bool,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
