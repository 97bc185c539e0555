//! Bearer token authentication extractor.
//!
//! Resolves the credential to a [`UserProfile`] through the identity
//! verifier. Tokens are accepted from:
//! - `Authorization: Bearer <token>` header
//! - `?token=<token>` query parameter (what browser WebSocket clients use)

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use confab_core::auth::IdentityVerifier;
use confab_types::error::AuthError;
use confab_types::user::UserProfile;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller. Extracting this verifies the bearer token.
pub struct CurrentUser(pub UserProfile);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Auth(AuthError::MissingCredential))?;
        let profile = state.verifier.verify(&token).await?;
        Ok(CurrentUser(profile))
    }
}

/// Pull the bearer token out of the request, header first, query second.
pub fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts.headers.get("authorization") {
        if let Ok(value) = auth.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let query = parts.uri.query()?;
    for pair in query.split('&') {
        if let Some(token) = pair.strip_prefix("token=") {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_for(uri: &str, auth_header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth_header {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_header_wins() {
        let parts = parts_for("/ws?token=querytoken", Some("Bearer headertoken"));
        assert_eq!(bearer_token(&parts).unwrap(), "headertoken");
    }

    #[test]
    fn test_query_token_fallback() {
        let parts = parts_for("/ws?foo=1&token=cfb_abc", None);
        assert_eq!(bearer_token(&parts).unwrap(), "cfb_abc");
    }

    #[test]
    fn test_missing_token() {
        let parts = parts_for("/ws", None);
        assert!(bearer_token(&parts).is_none());

        let parts = parts_for("/ws?token=", None);
        assert!(bearer_token(&parts).is_none());

        let parts = parts_for("/ws", Some("Basic dXNlcg=="));
        assert!(bearer_token(&parts).is_none());
    }
}
