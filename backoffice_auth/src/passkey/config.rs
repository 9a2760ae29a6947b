use std::env;

use url::Url;

use super::errors::PasskeyError;

/// Relying-party settings for both ceremonies.
#[derive(Debug, Clone, PartialEq)]
pub struct PasskeyConfig {
    pub origin: String,
    /// Host part of `origin`
    pub rp_id: String,
    pub rp_name: String,
    /// Client-side ceremony timeout in seconds
    pub timeout: u32,
    /// Server-side challenge lifetime in seconds
    pub challenge_timeout: u64,
    pub attestation: String,
    /// `None` lets the client pick any authenticator
    pub authenticator_attachment: Option<String>,
    pub resident_key: String,
    pub require_resident_key: bool,
    pub user_verification: String,
    /// Accept authenticators that always report a zero signature counter
    pub allow_zero_counter: bool,
}

impl PasskeyConfig {
    /// Defaults for everything except the origin.
    pub fn new(origin: &str) -> Result<Self, PasskeyError> {
        let rp_id = rp_id_from_origin(origin)?;
        Ok(Self {
            origin: origin.trim_end_matches('/').to_string(),
            rp_name: origin.to_string(),
            rp_id,
            timeout: 60,
            challenge_timeout: 60,
            attestation: "direct".to_string(),
            authenticator_attachment: Some("platform".to_string()),
            resident_key: "required".to_string(),
            require_resident_key: true,
            user_verification: "discouraged".to_string(),
            allow_zero_counter: false,
        })
    }

    /// `ORIGIN` is required; every other setting falls back to its default with a warning
    /// when invalid.
    pub fn from_env() -> Result<Self, PasskeyError> {
        let origin = env::var("ORIGIN")
            .map_err(|_| PasskeyError::Config("ORIGIN must be set".to_string()))?;
        let mut config = Self::new(&origin)?;

        if let Ok(name) = env::var("PASSKEY_RP_NAME") {
            config.rp_name = name;
        }
        config.timeout = parse_number("PASSKEY_TIMEOUT", config.timeout);
        config.challenge_timeout = parse_number("PASSKEY_CHALLENGE_TIMEOUT", config.challenge_timeout);
        config.attestation = parse_choice(
            "PASSKEY_ATTESTATION",
            &["none", "direct", "indirect", "enterprise"],
            &config.attestation,
        );
        config.authenticator_attachment = match env::var("PASSKEY_AUTHENTICATOR_ATTACHMENT") {
            Err(_) => config.authenticator_attachment,
            Ok(v) => match v.to_lowercase().as_str() {
                "platform" => Some("platform".to_string()),
                "cross-platform" => Some("cross-platform".to_string()),
                "none" => None,
                invalid => {
                    tracing::warn!(
                        "Invalid authenticator attachment: {}. Using default 'platform'",
                        invalid
                    );
                    Some("platform".to_string())
                }
            },
        };
        config.resident_key = parse_choice(
            "PASSKEY_RESIDENT_KEY",
            &["required", "preferred", "discouraged"],
            &config.resident_key,
        );
        config.require_resident_key =
            parse_bool("PASSKEY_REQUIRE_RESIDENT_KEY", config.require_resident_key);
        config.user_verification = parse_choice(
            "PASSKEY_USER_VERIFICATION",
            &["required", "preferred", "discouraged"],
            &config.user_verification,
        );
        config.allow_zero_counter =
            parse_bool("PASSKEY_ALLOW_ZERO_COUNTER", config.allow_zero_counter);

        Ok(config)
    }

    pub(crate) fn user_verification_required(&self) -> bool {
        self.user_verification == "required"
    }

    pub(crate) fn platform_only(&self) -> bool {
        self.authenticator_attachment.as_deref() == Some("platform")
    }
}

fn rp_id_from_origin(origin: &str) -> Result<String, PasskeyError> {
    let url = Url::parse(origin)
        .map_err(|e| PasskeyError::Config(format!("Invalid ORIGIN {origin}: {e}")))?;
    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| PasskeyError::Config(format!("ORIGIN has no host: {origin}")))
}

fn parse_number<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Err(_) => default,
        Ok(v) => v.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}: {}. Using default '{}'", key, v, default);
            default
        }),
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Err(_) => default,
        Ok(v) => match v.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            invalid => {
                tracing::warn!("Invalid {}: {}. Using default '{}'", key, invalid, default);
                default
            }
        },
    }
}

fn parse_choice(key: &str, allowed: &[&str], default: &str) -> String {
    match env::var(key) {
        Err(_) => default.to_string(),
        Ok(v) => {
            let v = v.to_lowercase();
            if allowed.contains(&v.as_str()) {
                v
            } else {
                tracing::warn!("Invalid {}: {}. Using default '{}'", key, v, default);
                default.to_string()
            }
        }
    }
}
