//! Process-wide configuration.

use std::sync::LazyLock;

use crate::coordination::AuthError;
use crate::passkey::PasskeyConfig;
use crate::registration::RegistrationConfig;
use crate::session::SessionConfig;

/// Route prefix for all authentication endpoints
///
/// Default: "/auth"
pub static AUTH_ROUTE_PREFIX: LazyLock<String> =
    LazyLock::new(|| std::env::var("AUTH_ROUTE_PREFIX").unwrap_or_else(|_| "/auth".to_string()));

/// Per-module settings, assembled once at startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub passkey: PasskeyConfig,
    pub session: SessionConfig,
    pub registration: RegistrationConfig,
}

impl AuthConfig {
    pub fn new(
        passkey: PasskeyConfig,
        session: SessionConfig,
        registration: RegistrationConfig,
    ) -> Self {
        Self {
            passkey,
            session,
            registration,
        }
    }

    /// Read every module's settings from the environment. `ORIGIN` and
    /// `AUTH_SERVER_SECRET` are required.
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            passkey: PasskeyConfig::from_env()?,
            session: SessionConfig::from_env(),
            registration: RegistrationConfig::from_env()?,
        })
    }
}
