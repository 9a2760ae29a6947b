use std::env;

use super::errors::RegistrationError;

const DEFAULT_TOKEN_TTL: u64 = 86400;
const MIN_SECRET_LEN: usize = 32;

#[derive(Clone, PartialEq)]
pub struct RegistrationConfig {
    /// HMAC key for approval tokens
    pub secret: Vec<u8>,
    /// Approval token lifetime in seconds
    pub token_ttl: u64,
}

impl std::fmt::Debug for RegistrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl RegistrationConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, RegistrationError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(RegistrationError::Config(format!(
                "AUTH_SERVER_SECRET must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            secret,
            token_ttl: DEFAULT_TOKEN_TTL,
        })
    }

    /// `AUTH_SERVER_SECRET` is required; `REGISTRATION_TOKEN_TTL` falls back to one day.
    pub fn from_env() -> Result<Self, RegistrationError> {
        let secret = env::var("AUTH_SERVER_SECRET")
            .map_err(|_| RegistrationError::Config("AUTH_SERVER_SECRET must be set".into()))?;
        let mut config = Self::new(secret.into_bytes())?;

        if let Ok(raw) = env::var("REGISTRATION_TOKEN_TTL") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.token_ttl = secs,
                _ => tracing::warn!(value = %raw, "Invalid REGISTRATION_TOKEN_TTL, using default"),
            }
        }

        Ok(config)
    }
}
