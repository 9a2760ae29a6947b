//! Database table configuration

use std::env;
use std::sync::LazyLock;

/// Table prefix from environment variable
pub static TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| "bo_".to_string()));

/// Authentication identities table name
pub static DB_TABLE_AUTH_IDENTITIES: LazyLock<String> =
    LazyLock::new(|| format!("{}{}", *TABLE_PREFIX, "auth_identities"));

/// Business identities table name
pub static DB_TABLE_BUSINESS_IDENTITIES: LazyLock<String> =
    LazyLock::new(|| format!("{}{}", *TABLE_PREFIX, "business_identities"));

/// Passkey credentials table name
pub static DB_TABLE_CREDENTIALS: LazyLock<String> =
    LazyLock::new(|| format!("{}{}", *TABLE_PREFIX, "credentials"));

/// Sessions table name
pub static DB_TABLE_SESSIONS: LazyLock<String> =
    LazyLock::new(|| format!("{}{}", *TABLE_PREFIX, "sessions"));

/// Registration requests table name
pub static DB_TABLE_REGISTRATION_REQUESTS: LazyLock<String> =
    LazyLock::new(|| format!("{}{}", *TABLE_PREFIX, "registration_requests"));
