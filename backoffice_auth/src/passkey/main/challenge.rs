use chrono::Utc;

use crate::context::AuthContext;
use crate::passkey::errors::PasskeyError;
use crate::passkey::types::StoredChallenge;
use crate::storage::CacheData;

pub(super) const REGISTRATION_CHALLENGE: &str = "reg_challenge";
pub(super) const AUTHENTICATION_CHALLENGE: &str = "auth_challenge";

/// Store a ceremony challenge under `prefix`/`key` for `challenge_timeout` seconds.
pub(super) async fn store_challenge(
    ctx: &AuthContext,
    prefix: &str,
    key: &str,
    challenge: &StoredChallenge,
) -> Result<(), PasskeyError> {
    let ttl = ctx.config().passkey.challenge_timeout;
    let data = CacheData::try_from(challenge)?;

    ctx.cache()
        .lock()
        .await
        .put_with_ttl(prefix, key, data, ttl)
        .await?;

    tracing::debug!(prefix, ttl, "Stored ceremony challenge");
    Ok(())
}

/// Atomically remove and return a challenge, so each challenge verifies at most once.
///
/// The cache honors the TTL; the issue time is checked as well in case a backend keeps
/// entries slightly longer.
pub(super) async fn take_challenge(
    ctx: &AuthContext,
    prefix: &str,
    key: &str,
) -> Result<StoredChallenge, PasskeyError> {
    let data = ctx
        .cache()
        .lock()
        .await
        .take(prefix, key)
        .await?
        .ok_or_else(|| PasskeyError::Challenge("Challenge not found".to_string()))?;

    let stored = StoredChallenge::try_from(data)?;

    let age = Utc::now().timestamp() - stored.issued_at;
    let timeout = ctx.config().passkey.challenge_timeout as i64;
    if age > timeout {
        tracing::warn!(age, timeout, "Challenge expired");
        return Err(PasskeyError::Challenge(
            "Challenge has expired. For more details, run with RUST_LOG=debug".into(),
        ));
    }

    Ok(stored)
}
