//! Password hashing and verification (bcrypt).
//!
//! Verifiers are standard `$2b$<cost>$<salt><digest>` strings. Hashing is
//! deliberately slow: async callers should go through [`PasswordHandler::hash_blocking`]
//! and [`PasswordHandler::verify_blocking`] so the work lands on the blocking pool
//! instead of stalling the runtime.

use base64::{
    alphabet,
    engine::{general_purpose::NO_PAD, GeneralPurpose},
    Engine as _,
};
use serde_json::Value;

use crate::config::PasswordConfig;
use crate::error::{AuthError, AuthResult};

pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;

const PASSWORD_REQUIRED: &str = "Password must be a non-empty string.";
const VERIFIER_REQUIRED: &str = "Hashed password must be a valid non-empty string.";
const PASSWORD_TOO_LONG: &str = "Password must be at most 72 bytes.";

// bcrypt only reads the first 72 bytes of its input
pub const MAX_PASSWORD_BYTES: usize = 72;

// $2b$ + two cost digits + $ + 22 salt chars + 31 digest chars
const VERIFIER_PREFIX: &str = "$2b$";
const VERIFIER_LEN: usize = 60;
const SALT_CHARS: usize = 22;

// Strict decoding: non-canonical trailing bits are rejected, so every
// character of the salt and digest is significant.
const BCRYPT_B64: GeneralPurpose = GeneralPurpose::new(&alphabet::BCRYPT, NO_PAD);

#[derive(Debug, Clone, Copy)]
pub struct PasswordHandler {
    cost: u32,
}

impl PasswordHandler {
    pub fn new(cost: u32) -> AuthResult<Self> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
            return Err(AuthError::invalid_input(format!(
                "Password hash cost must be between {} and {}",
                MIN_HASH_COST, MAX_HASH_COST
            )));
        }
        Ok(Self { cost })
    }

    pub fn from_config(config: &PasswordConfig) -> AuthResult<Self> {
        Self::new(config.hash_cost)
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password into a storable verifier.
    ///
    /// Every call draws a fresh random salt, so hashing the same password twice
    /// yields two different verifiers.
    ///
    /// Passwords longer than [`MAX_PASSWORD_BYTES`] (UTF-8 bytes, not chars) are
    /// rejected with `InvalidInput` rather than silently truncated.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        require_password(password)?;
        let verifier = bcrypt::hash(password, self.cost)?;
        Ok(verifier)
    }

    /// Check a plaintext password against a stored verifier.
    ///
    /// Blank inputs are rejected with `InvalidInput`. A verifier that is not a
    /// well-formed `$2b$` hash never matches. The same length limit as
    /// [`hash`](Self::hash) applies to the plaintext.
    pub fn verify(&self, password: &str, verifier: &str) -> AuthResult<bool> {
        require_password(password)?;
        require_text(verifier, VERIFIER_REQUIRED)?;

        if !is_canonical_verifier(verifier) {
            tracing::debug!("Password verification against a malformed verifier");
            return Ok(false);
        }

        match bcrypt::verify(password, verifier) {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::debug!("Password verification failed to parse verifier: {}", e);
                Ok(false)
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: String) -> AuthResult<String> {
        let handler = *self;
        tokio::task::spawn_blocking(move || handler.hash(&password)).await?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(&self, password: String, verifier: String) -> AuthResult<bool> {
        let handler = *self;
        tokio::task::spawn_blocking(move || handler.verify(&password, &verifier)).await?
    }
}

/// Read a plaintext password out of an untyped request value.
pub fn plaintext_from_value(value: &Value) -> AuthResult<&str> {
    string_from_value(value, PASSWORD_REQUIRED)
}

/// Read a stored verifier out of an untyped value.
pub fn verifier_from_value(value: &Value) -> AuthResult<&str> {
    string_from_value(value, VERIFIER_REQUIRED)
}

fn string_from_value<'a>(value: &'a Value, message: &str) -> AuthResult<&'a str> {
    let text = value.as_str().ok_or_else(|| AuthError::invalid_input(message))?;
    require_text(text, message)?;
    Ok(text)
}

fn require_password(password: &str) -> AuthResult<()> {
    require_text(password, PASSWORD_REQUIRED)?;
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::invalid_input(PASSWORD_TOO_LONG));
    }
    Ok(())
}

fn require_text(value: &str, message: &str) -> AuthResult<()> {
    if value.trim().is_empty() {
        return Err(AuthError::invalid_input(message));
    }
    Ok(())
}

fn is_canonical_verifier(verifier: &str) -> bool {
    if verifier.len() != VERIFIER_LEN || !verifier.is_ascii() {
        return false;
    }
    let Some(rest) = verifier.strip_prefix(VERIFIER_PREFIX) else {
        return false;
    };

    let (cost, rest) = rest.split_at(2);
    if !cost.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match cost.parse::<u32>() {
        Ok(cost) if (MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) => {}
        _ => return false,
    }

    let Some(encoded) = rest.strip_prefix('$') else {
        return false;
    };
    let (salt, digest) = encoded.split_at(SALT_CHARS);
    BCRYPT_B64.decode(salt).is_ok() && BCRYPT_B64.decode(digest).is_ok()
}
