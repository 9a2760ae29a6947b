use axum::{
    Router,
    extract::{Json, Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::ORIGIN},
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use backoffice_auth::{
    AuthContext, AuthenticationOptions, AuthenticationStartRequest, AuthenticatorResponse,
    PasskeyCredential, RegistrationFinishRequest, RegistrationOptions, RegistrationStartRequest,
    delete_passkey_credential_core, handle_finish_authentication_core,
    handle_finish_registration_core, handle_start_authentication_core,
    handle_start_registration_core, list_credentials_core,
};

use crate::IntoResponseError;
use crate::error::json_body;
use crate::session::AuthUser;

pub(crate) fn router() -> Router<AuthContext> {
    Router::new()
        .nest("/register", router_register())
        .nest("/authenticate", router_authenticate())
        .route("/credentials", get(list_passkey_credentials))
        .route("/credentials/{credential_id}", delete(delete_passkey_credential))
}

fn router_register() -> Router<AuthContext> {
    Router::new()
        .route("/start", post(handle_start_registration))
        .route("/finish", post(handle_finish_registration))
}

fn router_authenticate() -> Router<AuthContext> {
    Router::new()
        .route("/start", post(handle_start_authentication))
        .route("/finish", post(handle_finish_authentication))
}

async fn handle_start_registration(
    State(ctx): State<AuthContext>,
    payload: Result<Json<RegistrationStartRequest>, JsonRejection>,
) -> Result<Json<RegistrationOptions>, (StatusCode, String)> {
    let request = json_body(payload)?;
    handle_start_registration_core(&ctx, request)
        .await
        .into_response_error()
        .map(Json)
}

async fn handle_finish_registration(
    State(ctx): State<AuthContext>,
    payload: Result<Json<RegistrationFinishRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<Value>), (StatusCode, String)> {
    let request = json_body(payload)?;
    let (user, issued) = handle_finish_registration_core(&ctx, request)
        .await
        .into_response_error()?;
    Ok((issued.headers, Json(json!({ "user": user }))))
}

async fn handle_start_authentication(
    State(ctx): State<AuthContext>,
    headers: HeaderMap,
    payload: Result<Json<AuthenticationStartRequest>, JsonRejection>,
) -> Result<Json<AuthenticationOptions>, (StatusCode, String)> {
    let request = json_body(payload)?;
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    handle_start_authentication_core(&ctx, request, origin)
        .await
        .into_response_error()
        .map(Json)
}

async fn handle_finish_authentication(
    State(ctx): State<AuthContext>,
    payload: Result<Json<AuthenticatorResponse>, JsonRejection>,
) -> Result<(HeaderMap, Json<Value>), (StatusCode, String)> {
    let response = json_body(payload)?;
    let (user, issued) = handle_finish_authentication_core(&ctx, &response)
        .await
        .into_response_error()?;
    Ok((issued.headers, Json(json!({ "user": user }))))
}

async fn list_passkey_credentials(
    State(ctx): State<AuthContext>,
    user: AuthUser,
) -> Result<Json<Vec<PasskeyCredential>>, (StatusCode, String)> {
    list_credentials_core(&ctx, &user)
        .await
        .into_response_error()
        .map(Json)
}

async fn delete_passkey_credential(
    State(ctx): State<AuthContext>,
    user: AuthUser,
    Path(credential_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_passkey_credential_core(&ctx, &user, &credential_id)
        .await
        .into_response_error()?;
    Ok(StatusCode::NO_CONTENT)
}
