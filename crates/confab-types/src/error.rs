use thiserror::Error;

/// Errors from repository operations (used by trait definitions in confab-core).
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Authentication failures at connection or request time.
///
/// The client-facing message is deliberately generic: missing, malformed and
/// expired credentials are indistinguishable from outside. The variant is
/// still logged server-side.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication failed")]
    MissingCredential,

    #[error("authentication failed")]
    InvalidCredential,

    #[error("authentication backend unavailable")]
    Store(#[from] RepositoryError),
}

/// Rejections from the message pipeline and the conversation boundary.
///
/// Validation and not-found rejections are recovered at the boundary and
/// turned into a structured reply to the originating connection only;
/// persistence failures are additionally logged. Never broadcast.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("recipient not found")]
    UnknownRecipient,

    #[error("cannot send a message to yourself")]
    SelfMessage,

    #[error("message content is empty")]
    EmptyContent,

    #[error("message exceeds {limit} characters")]
    ContentTooLong { limit: usize },

    #[error("message not found")]
    MessageNotFound,

    #[error("not authorized to act on this message")]
    NotAuthorized,

    #[error("storage error: {0}")]
    Persistence(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_is_generic_for_credentials() {
        // Missing and invalid credentials must be indistinguishable.
        assert_eq!(
            AuthError::MissingCredential.to_string(),
            AuthError::InvalidCredential.to_string()
        );
    }

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::ContentTooLong { limit: 1000 };
        assert_eq!(err.to_string(), "message exceeds 1000 characters");
    }

    #[test]
    fn test_repository_error_wraps_into_chat_error() {
        let err: ChatError = RepositoryError::Query("disk I/O error".to_string()).into();
        assert!(matches!(err, ChatError::Persistence(_)));
        assert!(err.to_string().contains("disk I/O error"));
    }
}
