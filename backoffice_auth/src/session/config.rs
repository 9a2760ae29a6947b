use std::env;

const DEFAULT_COOKIE_NAME: &str = "__Host-BoSessionId";
const DEFAULT_MAX_AGE: u64 = 3600;
/// Browsers cap cookie lifetimes at 400 days.
pub(crate) const MAX_SESSION_AGE: u64 = 400 * 24 * 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Absolute session lifetime in seconds.
    pub max_age: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl SessionConfig {
    /// Read `SESSION_COOKIE_NAME` and `SESSION_MAX_AGE`, falling back to the defaults.
    pub fn from_env() -> Self {
        let cookie_name = env::var("SESSION_COOKIE_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        let max_age = match env::var("SESSION_MAX_AGE") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > MAX_SESSION_AGE => {
                    tracing::warn!(
                        value = %raw,
                        max = MAX_SESSION_AGE,
                        "SESSION_MAX_AGE too large, clamping"
                    );
                    MAX_SESSION_AGE
                }
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "Invalid SESSION_MAX_AGE, using default");
                    DEFAULT_MAX_AGE
                }
            },
            Err(_) => DEFAULT_MAX_AGE,
        };

        Self {
            cookie_name,
            max_age,
        }
    }

    /// Session lifetime in seconds, never longer than [`MAX_SESSION_AGE`].
    pub(crate) fn lifetime_secs(&self) -> i64 {
        self.max_age.min(MAX_SESSION_AGE) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Set an environment variable for the duration of the closure and restore it afterward.
    fn with_env_var<F, R>(key: &str, value: Option<&str>, test: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        match value {
            Some(val) => unsafe { env::set_var(key, val) },
            None => unsafe { env::remove_var(key) },
        }

        let result = test();

        match original {
            Some(val) => unsafe { env::set_var(key, val) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "__Host-BoSessionId");
        assert_eq!(config.max_age, 3600);
    }

    #[test]
    #[serial]
    fn test_session_max_age_from_env() {
        with_env_var("SESSION_MAX_AGE", Some("1800"), || {
            assert_eq!(SessionConfig::from_env().max_age, 1800);
        });
        with_env_var("SESSION_MAX_AGE", Some("invalid"), || {
            assert_eq!(SessionConfig::from_env().max_age, 3600);
        });
        with_env_var("SESSION_MAX_AGE", Some("0"), || {
            assert_eq!(SessionConfig::from_env().max_age, 3600);
        });
        with_env_var("SESSION_MAX_AGE", Some("18446744073709551615"), || {
            assert_eq!(SessionConfig::from_env().max_age, MAX_SESSION_AGE);
        });
    }

    #[test]
    fn test_lifetime_is_capped() {
        let config = SessionConfig {
            max_age: u64::MAX,
            ..SessionConfig::default()
        };
        assert_eq!(config.lifetime_secs(), MAX_SESSION_AGE as i64);
        assert_eq!(SessionConfig::default().lifetime_secs(), 3600);
    }
}
