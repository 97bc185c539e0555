//! SQLite-backed identity verifier.
//!
//! Bearer tokens are issued by the external account system and stored as
//! SHA-256 hashes in the `auth_tokens` table. Verification hashes the
//! presented credential and joins to the user row; the client-facing
//! failure is the same for missing and unknown tokens.

use chrono::Utc;
use confab_core::auth::IdentityVerifier;
use confab_types::error::{AuthError, RepositoryError};
use confab_types::user::UserProfile;
use sha2::{Digest, Sha256};

use super::directory::{UserRow, format_datetime};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `IdentityVerifier`.
pub struct SqliteTokenVerifier {
    pool: DatabasePool,
}

impl SqliteTokenVerifier {
    /// Create a new verifier backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Compute the SHA-256 hash of a bearer token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{digest:x}")
}

impl IdentityVerifier for SqliteTokenVerifier {
    async fn verify(&self, credential: &str) -> Result<UserProfile, AuthError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let token_hash = hash_token(credential);
        let row = sqlx::query(
            r#"SELECT u.id, u.username, u.is_online, u.last_active
               FROM auth_tokens t JOIN users u ON u.id = t.user_id
               WHERE t.token_hash = ?"#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| AuthError::Store(RepositoryError::Query(e.to_string())))?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredential);
        };

        let profile = UserRow::from_row(&row)
            .map_err(|e| AuthError::Store(RepositoryError::Query(e.to_string())))?
            .into_profile()
            .map_err(AuthError::Store)?;

        // Best effort usage stamp; a failure must not fail the login.
        let _ = sqlx::query("UPDATE auth_tokens SET last_used_at = ? WHERE token_hash = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&token_hash)
            .execute(&self.pool.writer)
            .await;

        Ok(profile)
    }
}
