//! Shared setup for unit tests: a fresh in-memory database and cache per test.

use std::sync::{Arc, Once};

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::passkey::PasskeyConfig;
use crate::registration::RegistrationConfig;
use crate::session::SessionConfig;
use crate::storage::{InMemoryCacheStore, SqliteDataStore};

pub(crate) const TEST_ORIGIN: &str = "https://example.com";

fn load_test_env() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }
    });
}

pub(crate) fn test_config() -> AuthConfig {
    AuthConfig::new(
        PasskeyConfig::new(TEST_ORIGIN).unwrap(),
        SessionConfig::default(),
        RegistrationConfig::new(b"test-secret-with-at-least-32-bytes!!".to_vec()).unwrap(),
    )
}

pub(crate) async fn test_context() -> AuthContext {
    test_context_with(test_config()).await
}

/// A context over its own database, so tests never observe each other's rows.
pub(crate) async fn test_context_with(config: AuthConfig) -> AuthContext {
    load_test_env();
    let store = SqliteDataStore::in_memory().await.unwrap();
    let ctx = AuthContext::new(Arc::new(store), Box::new(InMemoryCacheStore::new()), config);
    ctx.init().await.unwrap();
    ctx
}
