use axum::{
    Json, RequestPartsExt,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, StatusCode, request::Parts},
    response::IntoResponse,
};
use axum_extra::{TypedHeader, headers};
use serde_json::{Value, json};
use std::ops::Deref;

use backoffice_auth::{AuthContext, AuthError, SessionUser, logout_core, validate_session};

use crate::IntoResponseError;
use crate::error::{AUTH_FAILED, render};

/// The caller behind a fully validated session, available as an Axum extractor.
///
/// Unlike the cookie-presence middleware, this resolves the session against storage, so
/// the role and tenant are the current ones. A missing, unknown or expired session is
/// rejected with `401`.
///
/// ```no_run
/// use axum::{Router, routing::get};
/// use backoffice_auth::AuthContext;
/// use backoffice_auth_axum::AuthUser;
///
/// async fn whoami(user: AuthUser) -> String {
///     format!("{} ({})", user.display_name, user.role)
/// }
///
/// fn app(ctx: AuthContext) -> Router {
///     Router::new().route("/whoami", get(whoami)).with_state(ctx)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AuthUser(pub SessionUser);

impl Deref for AuthUser {
    type Target = SessionUser;

    fn deref(&self) -> &SessionUser {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AuthContext::from_ref(state);
        let unauthenticated = || (StatusCode::UNAUTHORIZED, AUTH_FAILED.to_string());

        let cookies: TypedHeader<headers::Cookie> = parts.extract().await.map_err(|_| {
            tracing::debug!("Request carries no cookies");
            unauthenticated()
        })?;

        let cookie_name = &ctx.config().session.cookie_name;
        let token = cookies.get(cookie_name).ok_or_else(|| {
            tracing::debug!(cookie_name = %cookie_name, "Session cookie missing");
            unauthenticated()
        })?;

        let user = validate_session(&ctx, token)
            .await
            .map_err(|e| render(&AuthError::from(e)))?;
        Ok(AuthUser(user))
    }
}

pub(crate) async fn current_session(user: AuthUser) -> Json<Value> {
    Json(json!({ "user": user.0 }))
}

pub(crate) async fn logout(
    State(ctx): State<AuthContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let cleared = logout_core(&ctx, &headers).await.into_response_error()?;
    Ok((StatusCode::NO_CONTENT, cleared))
}
