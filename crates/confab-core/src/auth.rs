//! IdentityVerifier trait definition.
//!
//! Validates a bearer credential presented at connect time and resolves it
//! to a user. Token issuance belongs to the external account system; the
//! reference implementation in `confab-infra` checks a SHA-256 hash of the
//! credential against the `auth_tokens` table.

use confab_types::error::AuthError;
use confab_types::user::UserProfile;

/// Resolves a bearer credential to the user it belongs to.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait IdentityVerifier: Send + Sync {
    /// Verify a credential and return the owning user.
    ///
    /// Missing and invalid credentials must be indistinguishable to the
    /// caller's client; only the server log may tell them apart.
    fn verify(
        &self,
        credential: &str,
    ) -> impl std::future::Future<Output = Result<UserProfile, AuthError>> + Send;
}
