use chrono::{Duration, Utc};
use http::header::{COOKIE, HeaderMap};
use uuid::Uuid;

use crate::context::AuthContext;
use crate::identity::load_identity;
use crate::session::errors::SessionError;
use crate::session::storage::SessionStore;
use crate::session::types::{IssuedSession, SessionUser, StoredSession};
use crate::storage::{DataConn, retry_transient};
use crate::utils::{base64url_encode, gen_random_string, header_set_cookie, sha256};

const SESSION_TOKEN_BYTES: usize = 32;

/// Sessions are looked up by a digest of the token, never the token itself.
fn token_hash(token: &str) -> String {
    base64url_encode(sha256(token))
}

/// Issue a session for an authenticated identity and build its `Set-Cookie` header.
#[tracing::instrument(skip(ctx))]
pub(crate) async fn issue_session(
    ctx: &AuthContext,
    auth_identity_id: &str,
) -> Result<IssuedSession, SessionError> {
    let config = &ctx.config().session;
    let token = gen_random_string(SESSION_TOKEN_BYTES)?;
    let now = Utc::now();
    let expires_at = now + Duration::seconds(config.lifetime_secs());

    let stored = StoredSession {
        id: Uuid::new_v4().to_string(),
        auth_identity_id: auth_identity_id.to_string(),
        token_hash: token_hash(&token),
        expires_at,
        created_at: now,
    };

    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    SessionStore::insert(&mut conn, &stored).await?;

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        &config.cookie_name,
        &token,
        config.lifetime_secs(),
    )?;

    tracing::info!(session_id = %stored.id, %expires_at, "Session issued");

    Ok(IssuedSession {
        token,
        expires_at,
        headers,
    })
}

/// Resolve a session token to the identity it belongs to.
///
/// Expiry is absolute; a session past `expires_at` is removed and rejected.
pub async fn validate_session(ctx: &AuthContext, token: &str) -> Result<SessionUser, SessionError> {
    let hash = token_hash(token);
    let hash_ref = hash.as_str();
    let store = ctx.data_store();

    let stored = retry_transient(|| async move {
        let mut conn = DataConn::acquire(store).await?;
        SessionStore::get_by_token_hash(&mut conn, hash_ref).await
    })
    .await?
    .ok_or(SessionError::NotFound)?;

    if stored.expires_at <= Utc::now() {
        tracing::debug!(session_id = %stored.id, expires_at = %stored.expires_at, "Session expired");
        let mut conn = DataConn::acquire(store).await?;
        SessionStore::delete_by_token_hash(&mut conn, &hash).await?;
        return Err(SessionError::Expired);
    }

    let mut conn = DataConn::acquire(store).await?;
    let identity = load_identity(&mut conn, &stored.auth_identity_id)
        .await?
        .ok_or(SessionError::NotFound)?;

    if !identity.is_active {
        tracing::info!(identity_id = %identity.id, "Session belongs to a deactivated identity");
        return Err(SessionError::NotFound);
    }

    Ok(SessionUser::new(identity, stored.expires_at))
}

/// Explicit logout. Returns a header that expires the cookie on the client.
#[tracing::instrument(skip_all)]
pub async fn revoke_session(ctx: &AuthContext, token: &str) -> Result<HeaderMap, SessionError> {
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    let removed = SessionStore::delete_by_token_hash(&mut conn, &token_hash(token)).await?;
    tracing::debug!(removed, "Session revoked");

    let mut headers = HeaderMap::new();
    header_set_cookie(&mut headers, &ctx.config().session.cookie_name, "", 0)?;
    Ok(headers)
}

/// Drop every session of an identity.
#[tracing::instrument(skip(ctx))]
pub async fn revoke_all_sessions(
    ctx: &AuthContext,
    auth_identity_id: &str,
) -> Result<u64, SessionError> {
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    let revoked = SessionStore::delete_for_identity(&mut conn, auth_identity_id).await?;
    tracing::info!(target: "audit", identity_id = %auth_identity_id, revoked, "Sessions revoked");
    Ok(revoked)
}

pub async fn purge_expired_sessions(ctx: &AuthContext) -> Result<u64, SessionError> {
    let mut conn = DataConn::acquire(ctx.data_store()).await?;
    let purged = SessionStore::delete_expired(&mut conn, Utc::now()).await?;
    if purged > 0 {
        tracing::info!(purged, "Purged expired sessions");
    }
    Ok(purged)
}

/// The value of the cookie named `cookie_name`, if the request carries one.
pub fn session_token_from_headers<'a>(
    headers: &'a HeaderMap,
    cookie_name: &str,
) -> Result<Option<&'a str>, SessionError> {
    let mut found = None;
    for cookie_header in headers.get_all(COOKIE) {
        let cookie_str = cookie_header.to_str().map_err(|e| {
            tracing::error!("Invalid cookie header: {}", e);
            SessionError::Header("Invalid cookie header".to_string())
        })?;

        found = cookie_str.split(';').map(str::trim).find_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            (name == cookie_name && !value.is_empty()).then_some(value)
        });
        if found.is_some() {
            break;
        }
    }

    if found.is_none() {
        tracing::debug!("No session cookie '{}' found in cookies", cookie_name);
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentitySeed, Role, ensure_identity};
    use crate::test_utils::test_context;
    use http::HeaderValue;
    use http::header::SET_COOKIE;

    async fn identity_id(ctx: &AuthContext, email: &str) -> String {
        let seed = IdentitySeed::new("Session User", Role::Staff, Some("t1".into()));
        ensure_identity(ctx.data_store(), email, Some(&seed))
            .await
            .unwrap()
            .identity
            .id
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let ctx = test_context().await;
        let id = identity_id(&ctx, "session@example.com").await;

        let issued = issue_session(&ctx, &id).await.unwrap();
        let cookie = issued.headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("__Host-BoSessionId={}", issued.token)));
        assert!(cookie.contains("Max-Age=3600"));

        let user = validate_session(&ctx, &issued.token).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Staff);
        assert_eq!(user.tenant_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_oversized_lifetime_is_capped_at_issue() {
        use crate::session::SessionConfig;
        use crate::session::config::MAX_SESSION_AGE;
        use crate::test_utils::{test_config, test_context_with};

        let mut config = test_config();
        config.session = SessionConfig {
            max_age: u64::MAX,
            ..SessionConfig::default()
        };
        let ctx = test_context_with(config).await;
        let id = identity_id(&ctx, "long@example.com").await;

        let issued = issue_session(&ctx, &id).await.unwrap();
        let cookie = issued.headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains(&format!("Max-Age={MAX_SESSION_AGE}")));
        assert!(issued.expires_at <= Utc::now() + Duration::seconds(MAX_SESSION_AGE as i64));
        assert!(validate_session(&ctx, &issued.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_is_not_stored_in_clear() {
        let ctx = test_context().await;
        let id = identity_id(&ctx, "hash@example.com").await;
        let issued = issue_session(&ctx, &id).await.unwrap();

        let mut conn = DataConn::acquire(ctx.data_store()).await.unwrap();
        assert!(
            SessionStore::get_by_token_hash(&mut conn, &issued.token)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            SessionStore::get_by_token_hash(&mut conn, &token_hash(&issued.token))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let ctx = test_context().await;
        let result = validate_session(&ctx, "no-such-token").await;
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let ctx = test_context().await;
        let id = identity_id(&ctx, "expired@example.com").await;

        let token = "expired-token";
        let stored = StoredSession {
            id: Uuid::new_v4().to_string(),
            auth_identity_id: id,
            token_hash: token_hash(token),
            expires_at: Utc::now() - Duration::seconds(1),
            created_at: Utc::now() - Duration::seconds(3601),
        };
        {
            let mut conn = DataConn::acquire(ctx.data_store()).await.unwrap();
            SessionStore::insert(&mut conn, &stored).await.unwrap();
        }

        assert!(matches!(
            validate_session(&ctx, token).await,
            Err(SessionError::Expired)
        ));
        assert!(matches!(
            validate_session(&ctx, token).await,
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_revoke_and_revoke_all() {
        let ctx = test_context().await;
        let id = identity_id(&ctx, "revoke@example.com").await;

        let first = issue_session(&ctx, &id).await.unwrap();
        let second = issue_session(&ctx, &id).await.unwrap();
        let third = issue_session(&ctx, &id).await.unwrap();

        let headers = revoke_session(&ctx, &first.token).await.unwrap();
        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
        assert!(validate_session(&ctx, &first.token).await.is_err());
        assert!(validate_session(&ctx, &second.token).await.is_ok());

        assert_eq!(revoke_all_sessions(&ctx, &id).await.unwrap(), 2);
        assert!(validate_session(&ctx, &second.token).await.is_err());
        assert!(validate_session(&ctx, &third.token).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let ctx = test_context().await;
        let id = identity_id(&ctx, "purge@example.com").await;
        let live = issue_session(&ctx, &id).await.unwrap();

        {
            let mut conn = DataConn::acquire(ctx.data_store()).await.unwrap();
            for n in 0..3 {
                let stale = StoredSession {
                    id: Uuid::new_v4().to_string(),
                    auth_identity_id: id.clone(),
                    token_hash: token_hash(&format!("stale-{n}")),
                    expires_at: Utc::now() - Duration::minutes(5),
                    created_at: Utc::now() - Duration::hours(2),
                };
                SessionStore::insert(&mut conn, &stale).await.unwrap();
            }
        }

        assert_eq!(purge_expired_sessions(&ctx).await.unwrap(), 3);
        assert!(validate_session(&ctx, &live.token).await.is_ok());
    }

    #[test]
    fn test_session_token_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; __Host-BoSessionId=abc123; other=1"),
        );
        assert_eq!(
            session_token_from_headers(&headers, "__Host-BoSessionId").unwrap(),
            Some("abc123")
        );
        assert_eq!(session_token_from_headers(&headers, "missing").unwrap(), None);

        let empty = HeaderMap::new();
        assert_eq!(
            session_token_from_headers(&empty, "__Host-BoSessionId").unwrap(),
            None
        );
    }

    #[test]
    fn test_empty_cookie_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("__Host-BoSessionId="));
        assert_eq!(
            session_token_from_headers(&headers, "__Host-BoSessionId").unwrap(),
            None
        );
    }
}
