use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::headers::{Cookie, HeaderMapExt};

use backoffice_auth::AuthContext;

use crate::config::AUTH_REDIRECT_ANON;
use crate::error::AUTH_FAILED;

/// Edge gatekeeper: lets a request through when it carries a non-empty session cookie.
///
/// Only presence is checked here. Handlers that need the caller use [`crate::AuthUser`],
/// which validates the session. Anonymous GET requests are redirected to
/// `AUTH_REDIRECT_ANON`; anything else gets `401`.
///
/// ```no_run
/// use axum::{Router, middleware::from_fn_with_state, routing::get};
/// use backoffice_auth::AuthContext;
/// use backoffice_auth_axum::require_session_cookie;
///
/// fn protected(ctx: AuthContext) -> Router {
///     Router::new()
///         .route("/dashboard", get(|| async { "ok" }))
///         .route_layer(from_fn_with_state(ctx.clone(), require_session_cookie))
///         .with_state(ctx)
/// }
/// ```
pub async fn require_session_cookie(
    State(ctx): State<AuthContext>,
    req: Request,
    next: Next,
) -> Response {
    let cookie_name = &ctx.config().session.cookie_name;
    let present = req
        .headers()
        .typed_get::<Cookie>()
        .and_then(|cookies| cookies.get(cookie_name).map(|v| !v.is_empty()))
        .unwrap_or(false);

    if present {
        return next.run(req).await;
    }

    tracing::debug!(method = %req.method(), path = %req.uri().path(), "No session cookie");
    if req.method() == Method::GET {
        Redirect::temporary(AUTH_REDIRECT_ANON.as_str()).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, AUTH_FAILED).into_response()
    }
}
