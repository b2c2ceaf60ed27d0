// auth/mod.rs - Credential issuance
//
// password: plaintext <-> bcrypt verifier
// jwt:      claim set <-> signed, time-bounded bearer token
// tokens:   access/refresh pairs and the refresh exchange

pub mod jwt;
pub mod password;
pub mod tokens;

pub use jwt::{Claims, JwtHandler};
pub use password::PasswordHandler;
pub use tokens::{TokenIssuer, TokenPair};
