//! Combined router for all authentication endpoints

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use backoffice_auth::AuthContext;

/// Every authentication endpoint, ready to be nested under `AUTH_ROUTE_PREFIX`.
///
/// - `/request-registration`, `/approve-registration`, `/reject-registration`,
///   `/registration-requests`, `/validate-token`
/// - `/passkey/register/...`, `/passkey/authenticate/...`, `/passkey/credentials`
/// - `/session`, `/logout`
/// - `/admin/...`
///
/// ```no_run
/// use axum::Router;
/// use backoffice_auth::{AUTH_ROUTE_PREFIX, AuthContext};
/// use backoffice_auth_axum::backoffice_auth_router;
///
/// fn app(ctx: AuthContext) -> Router {
///     Router::new().nest(AUTH_ROUTE_PREFIX.as_str(), backoffice_auth_router(ctx))
/// }
/// ```
pub fn backoffice_auth_router(ctx: AuthContext) -> Router {
    routes().with_state(ctx).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`backoffice_auth_router`] without the HTTP tracing layer.
pub fn backoffice_auth_router_no_trace(ctx: AuthContext) -> Router {
    routes().with_state(ctx)
}

fn routes() -> Router<AuthContext> {
    Router::new()
        .merge(super::registration::router())
        .nest("/passkey", super::passkey::router())
        .nest("/admin", super::admin::router())
        .route("/session", get(super::session::current_session))
        .route("/logout", post(super::session::logout))
}
