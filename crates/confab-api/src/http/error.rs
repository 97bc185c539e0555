//! Application error type mapping core rejections to HTTP responses.

use axum::response::{IntoResponse, Response};

use confab_types::error::{AuthError, ChatError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to the envelope format.
#[derive(Debug)]
pub enum AppError {
    /// Message pipeline and conversation boundary rejections.
    Chat(ChatError),
    /// Authentication failure.
    Auth(AuthError),
    /// Malformed request input (bad id format, bad query values).
    Validation(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AppError::Chat(ChatError::UnknownRecipient) => {
                ("NOT_FOUND", "User not found".to_string())
            }
            AppError::Chat(ChatError::MessageNotFound) => {
                ("NOT_FOUND", "Message not found".to_string())
            }
            AppError::Chat(ChatError::NotAuthorized) => {
                ("FORBIDDEN", "Not authorized to act on this message".to_string())
            }
            AppError::Chat(
                e @ (ChatError::SelfMessage
                | ChatError::EmptyContent
                | ChatError::ContentTooLong { .. }),
            ) => ("VALIDATION_ERROR", e.to_string()),
            AppError::Chat(ChatError::Persistence(e)) => {
                tracing::error!("persistence failure surfaced to client: {e}");
                ("PERSISTENCE_ERROR", "Message store unavailable".to_string())
            }
            AppError::Auth(AuthError::Store(e)) => {
                tracing::error!("auth backend failure: {e}");
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
            AppError::Auth(e) => ("UNAUTHORIZED", e.to_string()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
        };

        ApiResponse::error(code, &message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_unknown_recipient_maps_to_404() {
        let resp = AppError::from(ChatError::UnknownRecipient).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let resp = AppError::from(ChatError::EmptyContent).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_authorization_maps_to_403() {
        let resp = AppError::from(ChatError::NotAuthorized).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_auth_failure_maps_to_401() {
        let resp = AppError::from(AuthError::InvalidCredential).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
