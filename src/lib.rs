pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;

pub use auth::{Claims, JwtHandler, PasswordHandler, TokenIssuer, TokenPair};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, AuthResult};
pub use middleware::{authentication_middleware, AuthOutcome, AuthenticationRequired, CurrentUser};
