//! Configuration for the HTTP layer

use std::sync::LazyLock;

/// Where anonymous GET requests to protected routes are sent.
/// Default: "/"
pub static AUTH_REDIRECT_ANON: LazyLock<String> =
    LazyLock::new(|| std::env::var("AUTH_REDIRECT_ANON").unwrap_or_else(|_| "/".to_string()));

#[cfg(test)]
mod tests {
    fn get_redirect_anon(env_value: Option<&str>) -> String {
        env_value
            .map(|s| s.to_string())
            .unwrap_or_else(|| "/".to_string())
    }

    #[test]
    fn test_redirect_anon_default() {
        assert_eq!(get_redirect_anon(None), "/");
    }

    #[test]
    fn test_redirect_anon_custom() {
        assert_eq!(get_redirect_anon(Some("/login")), "/login");
    }
}
