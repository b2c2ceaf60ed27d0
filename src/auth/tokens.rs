use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::jwt::{self, Claims, JwtHandler, PURPOSE, REFRESH_PURPOSE};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

pub const TOKEN_TYPE: &str = "bearer";

/// Token response returned on login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token
    pub expires_in: DateTime<Utc>,
    pub token_type: String,
}

/// Issues linked access/refresh token pairs.
///
/// The two tokens share only their base claims. There is no family id and no
/// revocation list: a refresh token stays usable until it expires.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    jwt: JwtHandler,
    access_expire_minutes: u32,
    refresh_expire_minutes: u32,
}

impl TokenIssuer {
    pub fn new(jwt: JwtHandler, access_expire_minutes: u32, refresh_expire_minutes: u32) -> Self {
        Self {
            jwt,
            access_expire_minutes,
            refresh_expire_minutes,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            JwtHandler::from_config(&config.jwt),
            config.jwt.access_expire_minutes,
            config.jwt.refresh_expire_minutes,
        )
    }

    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    pub fn issue_pair(&self, claims: Claims) -> AuthResult<TokenPair> {
        let mut refresh_claims = claims.clone();
        refresh_claims.insert(PURPOSE.to_string(), Value::from(REFRESH_PURPOSE));

        let (access_token, expires_in) = self.jwt.encode(claims, self.access_expire_minutes)?;
        let (refresh_token, _) = self.jwt.encode(refresh_claims, self.refresh_expire_minutes)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in,
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    /// Exchange a (possibly expired) access token and a live refresh token for a new pair.
    pub fn refresh(&self, access_token: &str, refresh_token: &str) -> AuthResult<TokenPair> {
        let access = self.jwt.decode_ignoring_expiry(access_token)?;
        let refresh = self.jwt.decode(refresh_token)?;

        if jwt::is_refresh(&access) {
            tracing::warn!("Refresh exchange presented a refresh token in place of the access token");
            return Err(AuthError::TokenInvalid);
        }
        if !jwt::is_refresh(&refresh) {
            tracing::warn!("Refresh exchange presented a token without the refresh purpose");
            return Err(AuthError::TokenInvalid);
        }

        let subject = match (jwt::subject(&access), jwt::subject(&refresh)) {
            (Some(a), Some(r)) if a == r => a.to_string(),
            _ => {
                tracing::warn!("Refresh exchange subject mismatch");
                return Err(AuthError::TokenInvalid);
            }
        };

        tracing::debug!("Refreshing token pair for subject {}", subject);
        self.issue_pair(jwt::strip_reserved(access))
    }
}
