use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AuthConfig;
use crate::coordination::AuthError;
use crate::identity::IdentityStore;
use crate::passkey::PasskeyStore;
use crate::registration::RegistrationStore;
use crate::session::SessionStore;
use crate::storage::{
    CacheStore, DataConn, DataStore, cache_store_from_env, close_data_store, data_store_from_env,
};

/// Everything an operation needs: the relational store, the challenge cache and the
/// configuration. Cloning is cheap; clones share the same stores.
#[derive(Clone)]
pub struct AuthContext {
    data_store: Arc<dyn DataStore>,
    cache: Arc<Mutex<Box<dyn CacheStore>>>,
    config: Arc<AuthConfig>,
}

impl AuthContext {
    pub fn new(
        data_store: Arc<dyn DataStore>,
        cache: Box<dyn CacheStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            data_store,
            cache: Arc::new(Mutex::new(cache)),
            config: Arc::new(config),
        }
    }

    /// Build the stores and configuration from environment variables.
    pub async fn from_env() -> Result<Self, AuthError> {
        let config = AuthConfig::from_env()?;
        let data_store = data_store_from_env()?;
        let cache = cache_store_from_env().await?;
        Ok(Self::new(data_store, cache, config))
    }

    /// Create missing tables and initialize the cache.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> Result<(), AuthError> {
        {
            let mut conn = DataConn::acquire(self.data_store()).await?;
            // referenced tables first
            IdentityStore::init(&mut conn).await?;
            PasskeyStore::init(&mut conn).await?;
            SessionStore::init(&mut conn).await?;
            RegistrationStore::init(&mut conn).await?;
        }
        self.cache.lock().await.init().await?;

        tracing::info!("Auth stores initialized");
        Ok(())
    }

    pub async fn shutdown(&self) {
        close_data_store(self.data_store()).await;
        tracing::info!("Data store closed");
    }

    pub fn data_store(&self) -> &dyn DataStore {
        self.data_store.as_ref()
    }

    pub fn cache(&self) -> &Mutex<Box<dyn CacheStore>> {
        &self.cache
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
