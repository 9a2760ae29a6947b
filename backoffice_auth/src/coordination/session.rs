use http::HeaderMap;

use crate::context::AuthContext;
use crate::session::{SessionUser, revoke_session, session_token_from_headers, validate_session};

use super::errors::AuthError;

/// Resolve the session cookie in `headers` to its user.
pub async fn get_session_user_core(
    ctx: &AuthContext,
    headers: &HeaderMap,
) -> Result<SessionUser, AuthError> {
    let token = session_token_from_headers(headers, &ctx.config().session.cookie_name)?
        .ok_or(AuthError::Unauthenticated)?;
    Ok(validate_session(ctx, token).await?)
}

/// End the session named by the cookie, if any, and return headers that clear the cookie.
pub async fn logout_core(ctx: &AuthContext, headers: &HeaderMap) -> Result<HeaderMap, AuthError> {
    let token = session_token_from_headers(headers, &ctx.config().session.cookie_name)?;
    let token = token.unwrap_or_default();
    Ok(revoke_session(ctx, token).await?)
}
