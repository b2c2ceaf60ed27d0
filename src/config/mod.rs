use jsonwebtoken::Algorithm;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::password::{MAX_HASH_COST, MIN_HASH_COST};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET_KEY must be set to a non-empty value")]
    MissingSecret,

    #[error("Unsupported JWT algorithm '{0}' (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),

    #[error("Invalid token lifetime: {0}")]
    InvalidLifetime(String),

    #[error("Password hash cost {0} is outside {min}..={max}", min = MIN_HASH_COST, max = MAX_HASH_COST)]
    InvalidHashCost(u32),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Signing configuration, fixed for the lifetime of the process.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_expire_minutes: u32,
    pub refresh_expire_minutes: u32,
}

// Keep the secret out of debug output and logs
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_expire_minutes", &self.access_expire_minutes)
            .field("refresh_expire_minutes", &self.refresh_expire_minutes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub hash_cost: u32,
}

impl AuthConfig {
    /// Load `.env` if present, then read the configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)?;

        config.validate()?;
        tracing::info!(
            "Authentication configured for {:?} ({:?}, access {}m, refresh {}m)",
            config.environment,
            config.jwt.algorithm,
            config.jwt.access_expire_minutes,
            config.jwt.refresh_expire_minutes
        );
        Ok(config)
    }

    /// Development defaults around an explicit secret, mostly for tests and tooling.
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.jwt.secret_key = secret_key.into();
        config
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("JWT_SECRET_KEY") {
            self.jwt.secret_key = v;
        }
        if let Some(v) = lookup("JWT_ALGORITHM") {
            self.jwt.algorithm = parse_algorithm(&v)?;
        }
        if let Some(v) = lookup("JWT_EXPIRE_MINUTES") {
            self.jwt.access_expire_minutes = parse_number("JWT_EXPIRE_MINUTES", &v)?;
        }
        if let Some(v) = lookup("JWT_REFRESH_EXPIRE_MINUTES") {
            self.jwt.refresh_expire_minutes = parse_number("JWT_REFRESH_EXPIRE_MINUTES", &v)?;
        }
        if let Some(v) = lookup("PASSWORD_HASH_COST") {
            self.password.hash_cost = parse_number("PASSWORD_HASH_COST", &v)?;
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if !is_hmac(self.jwt.algorithm) {
            return Err(ConfigError::UnsupportedAlgorithm(format!("{:?}", self.jwt.algorithm)));
        }
        if self.jwt.access_expire_minutes == 0 {
            return Err(ConfigError::InvalidLifetime(
                "access token lifetime must be at least one minute".to_string(),
            ));
        }
        if self.jwt.refresh_expire_minutes <= self.jwt.access_expire_minutes {
            return Err(ConfigError::InvalidLifetime(format!(
                "refresh token lifetime ({}m) must exceed access token lifetime ({}m)",
                self.jwt.refresh_expire_minutes, self.jwt.access_expire_minutes
            )));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.password.hash_cost) {
            return Err(ConfigError::InvalidHashCost(self.password.hash_cost));
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            jwt: JwtConfig {
                secret_key: String::new(),
                algorithm: Algorithm::HS256,
                access_expire_minutes: 60,
                refresh_expire_minutes: 60 * 24 * 7, // 1 week
            },
            password: PasswordConfig { hash_cost: 10 },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            jwt: JwtConfig {
                secret_key: String::new(),
                algorithm: Algorithm::HS256,
                access_expire_minutes: 30,
                refresh_expire_minutes: 60 * 24 * 3,
            },
            password: PasswordConfig { hash_cost: bcrypt::DEFAULT_COST },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            jwt: JwtConfig {
                secret_key: String::new(),
                algorithm: Algorithm::HS256,
                access_expire_minutes: 15,
                refresh_expire_minutes: 60 * 24,
            },
            password: PasswordConfig { hash_cost: bcrypt::DEFAULT_COST },
        }
    }
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(value.trim())
        .map_err(|_| ConfigError::UnsupportedAlgorithm(value.to_string()))?;
    if !is_hmac(algorithm) {
        return Err(ConfigError::UnsupportedAlgorithm(value.to_string()));
    }
    Ok(algorithm)
}

fn parse_number(name: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}
