// Authentication Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors raised by the credential store, the token issuer and the request gate.
///
/// Token failures are deliberately coarse: callers learn whether a token is
/// expired or otherwise unusable, never which check rejected it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // 400 Bad Request
    #[error("{0}")]
    InvalidInput(String),

    // 401 Unauthorized
    #[error("Expired token")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Authentication required")]
    Unauthenticated,

    // 500 Internal Server Error
    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl AuthError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AuthError::InvalidInput(message.into())
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidInput(_) => 400,
            AuthError::TokenExpired => 401,
            AuthError::TokenInvalid => 401,
            AuthError::Unauthenticated => 401,
            AuthError::TokenEncoding(_) => 500,
            AuthError::Hashing(_) => 500,
            AuthError::TaskFailed(_) => 500,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidInput(_) => "INVALID_INPUT",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::Unauthenticated => "UNAUTHORIZED",
            AuthError::TokenEncoding(_) | AuthError::Hashing(_) | AuthError::TaskFailed(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            AuthError::TokenEncoding(_) | AuthError::Hashing(_) | AuthError::TaskFailed(_) => {
                "An error occurred while processing your request".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::TaskFailed(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AuthError::Hashing(err.to_string())
    }
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        if self.is_internal() {
            // Log the real error but return generic message
            tracing::error!("Authentication internal error: {}", self);
        }
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::invalid_input("bad").status_code(), 400);
        assert_eq!(AuthError::TokenExpired.status_code(), 401);
        assert_eq!(AuthError::TokenInvalid.status_code(), 401);
        assert_eq!(AuthError::Unauthenticated.status_code(), 401);
        assert_eq!(AuthError::Hashing("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AuthError::TokenEncoding("secret detail".into());
        assert_eq!(err.message(), "An error occurred while processing your request");
        assert!(!err.to_json().to_string().contains("secret detail"));
    }

    #[test]
    fn test_invalid_input_keeps_message() {
        let err = AuthError::invalid_input("Password must be a non-empty string.");
        assert_eq!(err.message(), "Password must be a non-empty string.");
        assert_eq!(err.to_json()["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_expired_token_response() {
        let response = AuthError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "TOKEN_EXPIRED");
        assert_eq!(body["message"], "Expired token");
    }
}
