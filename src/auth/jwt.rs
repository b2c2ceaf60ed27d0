use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Claim set carried by a token: caller fields plus the system-managed ones.
pub type Claims = Map<String, Value>;

pub const EXP: &str = "exp";
pub const JTI: &str = "jti";
pub const IAT: &str = "iat";
pub const SUB: &str = "sub";
pub const PURPOSE: &str = "purpose";
pub const REFRESH_PURPOSE: &str = "refresh_token";

const RESERVED: [&str; 3] = [EXP, JTI, IAT];

/// Subject identity carried by a claim set, if it is a string.
pub fn subject(claims: &Claims) -> Option<&str> {
    claims.get(SUB).and_then(Value::as_str)
}

/// Drop the system-managed claims so the remainder can be re-issued.
pub fn strip_reserved(mut claims: Claims) -> Claims {
    for name in RESERVED {
        claims.remove(name);
    }
    claims
}

pub fn is_refresh(claims: &Claims) -> bool {
    claims.get(PURPOSE).and_then(Value::as_str) == Some(REFRESH_PURPOSE)
}

/// Issues and verifies signed bearer tokens for one signing configuration.
///
/// The key and algorithm are fixed at construction; the handler holds no
/// mutable state and can be shared freely across request tasks.
#[derive(Clone)]
pub struct JwtHandler {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtHandler")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl JwtHandler {
    pub fn new(secret_key: &str, algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret_key, config.algorithm)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign `claims` into a token valid for `lifetime_minutes`.
    ///
    /// `exp`, `jti` and `iat` are always set here; caller-supplied values for
    /// those names are overwritten. Returns the token and its expiry instant.
    pub fn encode(&self, mut claims: Claims, lifetime_minutes: u32) -> AuthResult<(String, DateTime<Utc>)> {
        if lifetime_minutes == 0 {
            return Err(AuthError::invalid_input("Token lifetime must be at least one minute"));
        }

        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::minutes(i64::from(lifetime_minutes));

        claims.insert(EXP.to_string(), Value::from(expires_at.timestamp()));
        claims.insert(JTI.to_string(), Value::from(Uuid::new_v4().to_string()));
        claims.insert(IAT.to_string(), Value::from(issued_at.timestamp()));

        let token = jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))?;

        // Report the instant actually carried by the token (whole seconds)
        let expires_at = DateTime::from_timestamp(expires_at.timestamp(), 0).unwrap_or(expires_at);
        Ok((token, expires_at))
    }

    /// Verify signature and expiry, returning the claim set.
    pub fn decode(&self, token: &str) -> AuthResult<Claims> {
        self.decode_with(token, true)
    }

    /// Verify the signature only; an expired token still yields its claims.
    pub fn decode_ignoring_expiry(&self, token: &str) -> AuthResult<Claims> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> AuthResult<Claims> {
        let validation = self.validation(validate_exp);

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Rejected expired token");
                    AuthError::TokenExpired
                }
                kind => {
                    tracing::debug!("Rejected invalid token: {:?}", kind);
                    AuthError::TokenInvalid
                }
            })
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        validation.validate_nbf = false;
        // Audience and issuer are caller data here, not checked by the handler
        validation.validate_aud = false;
        validation.set_required_spec_claims(&[EXP]);
        validation
    }
}
