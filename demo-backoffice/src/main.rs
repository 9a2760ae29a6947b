use axum::{Router, response::Html, routing::get};

use backoffice_auth::bootstrap_admin_core;
use backoffice_auth_axum::{AUTH_ROUTE_PREFIX, AuthContext, backoffice_auth_router};

mod protected;
mod server;

async fn index() -> Html<String> {
    Html(format!(
        "<p>Back-office demo. Sign in through <code>{}/passkey/authenticate/start</code>.</p>",
        AUTH_ROUTE_PREFIX.as_str()
    ))
}

/// Queue and approve `BOOTSTRAP_ADMIN_EMAIL` so a fresh database has an approver.
async fn bootstrap_admin(ctx: &AuthContext) -> Result<(), Box<dyn std::error::Error>> {
    let Ok(email) = std::env::var("BOOTSTRAP_ADMIN_EMAIL") else {
        return Ok(());
    };
    if let Some(approved) = bootstrap_admin_core(ctx, &email, "Administrator").await? {
        tracing::info!(
            request_id = %approved.request_id,
            approval_token = %approved.approval_token,
            expires_at = %approved.expires_at,
            "Bootstrap admin approved; register a passkey with this token"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    server::init_tracing("demo_backoffice");

    let ctx = AuthContext::from_env().await?;
    ctx.init().await?;
    bootstrap_admin(&ctx).await?;

    let app = Router::new()
        .route("/", get(index))
        .nest("/bookings", protected::router(ctx.clone()))
        .nest(AUTH_ROUTE_PREFIX.as_str(), backoffice_auth_router(ctx.clone()));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    server::serve(port, app).await?;

    ctx.shutdown().await;
    Ok(())
}
