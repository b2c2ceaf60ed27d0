#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, Once};

use anyhow::{bail, Context, Result};
use serde_json::json;
use uuid::Uuid;

use blog_auth::{AuthConfig, Claims, PasswordHandler, TokenIssuer, TokenPair};

pub const SECRET: &str = "integration-test-secret";

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Development config with the cheapest bcrypt cost so tests stay fast
pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::with_secret(SECRET);
    config.password.hash_cost = 4;
    config.jwt.access_expire_minutes = 10;
    config.jwt.refresh_expire_minutes = 60;
    config
}

struct StoredUser {
    uuid: Uuid,
    username: String,
    verifier: String,
}

/// Minimal stand-in for the user table: enough to drive register and login.
pub struct UserDirectory {
    passwords: PasswordHandler,
    tokens: TokenIssuer,
    users: Mutex<HashMap<String, StoredUser>>,
}

impl UserDirectory {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        Ok(Self {
            passwords: PasswordHandler::from_config(&config.password)?,
            tokens: TokenIssuer::from_config(config),
            users: Mutex::new(HashMap::new()),
        })
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<(Uuid, TokenPair)> {
        let verifier = self.passwords.hash_blocking(password.to_string()).await?;
        let uuid = Uuid::new_v4();
        {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(email) {
                bail!("user {} already exists", email);
            }
            users.insert(
                email.to_string(),
                StoredUser {
                    uuid,
                    username: username.to_string(),
                    verifier,
                },
            );
        }
        let pair = self.login(email, password).await?;
        Ok((uuid, pair))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair> {
        let (uuid, username, verifier) = {
            let users = self.users.lock().unwrap();
            let user = users.get(email).context("unknown user")?;
            (user.uuid, user.username.clone(), user.verifier.clone())
        };

        if !self.passwords.verify_blocking(password.to_string(), verifier).await? {
            bail!("invalid credentials");
        }

        let claims: Claims = json!({
            "sub": uuid.to_string(),
            "email": email,
            "username": username,
        })
        .as_object()
        .cloned()
        .context("claims must be an object")?;

        Ok(self.tokens.issue_pair(claims)?)
    }
}
