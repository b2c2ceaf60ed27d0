use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::auth::jwt::{self, JwtHandler};
use crate::error::AuthError;

/// Authenticated identity attached to a request: the token's subject
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub subject: String,
}

/// Result of authenticating one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Unauthenticated,
    Authenticated(CurrentUser),
}

impl AuthOutcome {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            AuthOutcome::Authenticated(user) => Some(user),
            AuthOutcome::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

/// Extract the token from an `Authorization` header value of the form `Bearer <token>`.
///
/// The scheme is matched case-insensitively and the value must split into
/// exactly two whitespace-separated parts.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// Authenticate a request from its raw `Authorization` header.
///
/// Expired and invalid tokens both end as `Unauthenticated`; callers that need
/// the distinction should use [`JwtHandler::decode`] directly.
pub fn authenticate(header: Option<&str>, jwt: &JwtHandler) -> AuthOutcome {
    let Some(header) = header else {
        tracing::debug!("No Authorization header");
        return AuthOutcome::Unauthenticated;
    };

    let Some(token) = bearer_token(header) else {
        tracing::debug!("Authorization header is not a bearer credential");
        return AuthOutcome::Unauthenticated;
    };

    let claims = match jwt.decode(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Bearer token rejected: {}", e);
            return AuthOutcome::Unauthenticated;
        }
    };

    match jwt::subject(&claims) {
        Some(subject) => AuthOutcome::Authenticated(CurrentUser {
            subject: subject.to_string(),
        }),
        None => {
            tracing::debug!("Bearer token carries no subject claim");
            AuthOutcome::Unauthenticated
        }
    }
}

/// Attach an [`AuthOutcome`] to every request. Never rejects; gate handlers
/// with [`AuthenticationRequired`].
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/users/me", get(me))
///     .layer(axum::middleware::from_fn_with_state(jwt.clone(), authentication_middleware));
/// ```
pub async fn authentication_middleware(
    State(jwt): State<JwtHandler>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let outcome = authenticate(header, &jwt);
    request.extensions_mut().insert(outcome);

    next.run(request).await
}

fn outcome_from_parts(parts: &Parts) -> AuthOutcome {
    parts
        .extensions
        .get::<AuthOutcome>()
        .cloned()
        .unwrap_or(AuthOutcome::Unauthenticated)
}

/// Extractor for handlers that require an authenticated user (401 otherwise)
pub struct AuthenticationRequired(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticationRequired
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match outcome_from_parts(parts) {
            AuthOutcome::Authenticated(user) => Ok(AuthenticationRequired(user)),
            AuthOutcome::Unauthenticated => Err(AuthError::Unauthenticated),
        }
    }
}

/// Extractor for handlers that behave differently for signed-in users
pub struct MaybeAuthenticated(pub Option<CurrentUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthenticated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match outcome_from_parts(parts) {
            AuthOutcome::Authenticated(user) => Ok(MaybeAuthenticated(Some(user))),
            AuthOutcome::Unauthenticated => Ok(MaybeAuthenticated(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;
    use serde_json::json;

    fn handler() -> JwtHandler {
        JwtHandler::new("Secret-Key", Algorithm::HS256)
    }

    fn token_for(jwt: &JwtHandler, claims: serde_json::Value) -> String {
        jwt.encode(claims.as_object().cloned().unwrap(), 5).unwrap().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER   abc  "), Some("abc"));
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer abc def"), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        assert_eq!(authenticate(None, &handler()), AuthOutcome::Unauthenticated);
    }

    #[test]
    fn test_garbage_token_is_unauthenticated() {
        assert_eq!(
            authenticate(Some("Bearer garbage"), &handler()),
            AuthOutcome::Unauthenticated
        );
    }

    #[test]
    fn test_valid_token_is_authenticated() {
        let jwt = handler();
        let token = token_for(&jwt, json!({ "sub": "user-42", "username": "jane" }));
        let outcome = authenticate(Some(&format!("Bearer {}", token)), &jwt);
        assert_eq!(
            outcome,
            AuthOutcome::Authenticated(CurrentUser { subject: "user-42".to_string() })
        );
        assert!(outcome.is_authenticated());
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let jwt = handler();
        let now = chrono::Utc::now().timestamp();
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &json!({ "sub": "user-42", "iat": now - 660, "exp": now - 60 }),
            &jsonwebtoken::EncodingKey::from_secret("Secret-Key".as_bytes()),
        )
        .unwrap();

        // signature is good, only the expiry fails
        assert_eq!(jwt.decode(&token), Err(AuthError::TokenExpired));
        let outcome = authenticate(Some(&format!("Bearer {}", token)), &jwt);
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    #[test]
    fn test_token_without_subject_is_unauthenticated() {
        let jwt = handler();
        let token = token_for(&jwt, json!({ "username": "jane" }));
        let outcome = authenticate(Some(&format!("Bearer {}", token)), &jwt);
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    #[tokio::test]
    async fn test_required_extractor_rejects_without_outcome() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts();

        let result = AuthenticationRequired::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));

        let MaybeAuthenticated(user) = MaybeAuthenticated::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_required_extractor_reads_outcome() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(AuthOutcome::Authenticated(CurrentUser {
            subject: "user-7".to_string(),
        }));

        let AuthenticationRequired(user) = AuthenticationRequired::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.subject, "user-7");
    }
}
