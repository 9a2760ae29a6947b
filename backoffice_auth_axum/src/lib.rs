//! Axum surface for `backoffice_auth`.
//!
//! [`backoffice_auth_router`] serves the registration, passkey, session and admin
//! endpoints. Application routes are protected in two tiers: [`require_session_cookie`]
//! turns away requests without a session cookie, and the [`AuthUser`] extractor validates
//! the session inside each handler.

mod admin;
mod config;
mod error;
mod middleware;
mod passkey;
mod registration;
mod router;
mod session;

#[cfg(test)]
mod test_utils;

pub use config::AUTH_REDIRECT_ANON;
pub use error::IntoResponseError;
pub use middleware::require_session_cookie;
pub use router::{backoffice_auth_router, backoffice_auth_router_no_trace};
pub use session::AuthUser;

pub use backoffice_auth::{AUTH_ROUTE_PREFIX, AuthContext};
