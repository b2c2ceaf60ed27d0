pub mod auth;

pub use auth::{
    authenticate, authentication_middleware, bearer_token, AuthOutcome, AuthenticationRequired,
    CurrentUser, MaybeAuthenticated,
};
