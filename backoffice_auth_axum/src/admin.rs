//! Identity administration. Every route requires an admin session.

use axum::{
    Router,
    extract::{Json, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use backoffice_auth::{
    AuthContext, MalformedIdentity, RoleChangeRequest, change_role_core,
    correct_identity_email_core, list_malformed_identities_core, reconcile_email_core,
};

use crate::IntoResponseError;
use crate::error::json_body;
use crate::session::AuthUser;

pub(crate) fn router() -> Router<AuthContext> {
    Router::new()
        .route("/identities/{identity_id}/role", put(change_role))
        .route("/identities/{identity_id}/email", put(correct_email))
        .route("/reconcile", post(reconcile))
        .route("/malformed-identities", get(list_malformed_identities))
}

#[derive(Debug, Deserialize)]
struct EmailBody {
    email: String,
}

async fn change_role(
    State(ctx): State<AuthContext>,
    admin: AuthUser,
    Path(identity_id): Path<String>,
    payload: Result<Json<RoleChangeRequest>, JsonRejection>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let body = json_body(payload)?;
    let identity = change_role_core(&ctx, &admin, &identity_id, body)
        .await
        .into_response_error()?;
    Ok(Json(json!({ "user": identity })))
}

async fn correct_email(
    State(ctx): State<AuthContext>,
    admin: AuthUser,
    Path(identity_id): Path<String>,
    payload: Result<Json<EmailBody>, JsonRejection>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let body = json_body(payload)?;
    let identity = correct_identity_email_core(&ctx, &admin, &identity_id, &body.email)
        .await
        .into_response_error()?;
    Ok(Json(json!({ "user": identity })))
}

async fn reconcile(
    State(ctx): State<AuthContext>,
    admin: AuthUser,
    payload: Result<Json<EmailBody>, JsonRejection>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let body = json_body(payload)?;
    let outcome = reconcile_email_core(&ctx, &admin, &body.email)
        .await
        .into_response_error()?;
    Ok(Json(json!({
        "identityId": outcome.identity.id,
        "writes": outcome.writes,
    })))
}

async fn list_malformed_identities(
    State(ctx): State<AuthContext>,
    admin: AuthUser,
) -> Result<Json<Vec<MalformedIdentity>>, (StatusCode, String)> {
    list_malformed_identities_core(&ctx, &admin)
        .await
        .into_response_error()
        .map(Json)
}
