use axum::{
    Router,
    extract::{Json, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use backoffice_auth::{
    ApproveRegistrationBody, ApprovedRegistration, AuthContext, AuthError, RegistrationRequest,
    RegistrationRequestBody, RequestStatus, approve_registration_core,
    list_registration_requests_core, reject_registration_core, request_registration_core,
    validate_token_core,
};

use crate::IntoResponseError;
use crate::error::{json_body, render};
use crate::session::AuthUser;

pub(crate) fn router() -> Router<AuthContext> {
    Router::new()
        .route("/request-registration", post(request_registration))
        .route("/approve-registration", post(approve_registration))
        .route("/reject-registration", post(reject_registration))
        .route("/registration-requests", get(list_registration_requests))
        .route("/validate-token", get(validate_token))
}

async fn request_registration(
    State(ctx): State<AuthContext>,
    payload: Result<Json<RegistrationRequestBody>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = json_body(payload)?;
    let request_id = request_registration_core(&ctx, body)
        .await
        .into_response_error_conflict_as_bad_request()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "requestId": request_id })),
    ))
}

async fn approve_registration(
    State(ctx): State<AuthContext>,
    admin: AuthUser,
    payload: Result<Json<ApproveRegistrationBody>, JsonRejection>,
) -> Result<Json<ApprovedRegistration>, (StatusCode, String)> {
    let body = json_body(payload)?;
    approve_registration_core(&ctx, &admin, body)
        .await
        .into_response_error()
        .map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectRegistrationBody {
    request_id: String,
}

async fn reject_registration(
    State(ctx): State<AuthContext>,
    admin: AuthUser,
    payload: Result<Json<RejectRegistrationBody>, JsonRejection>,
) -> Result<StatusCode, (StatusCode, String)> {
    let body = json_body(payload)?;
    reject_registration_core(&ctx, &admin, &body.request_id)
        .await
        .into_response_error()?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct StatusFilter {
    status: Option<String>,
}

async fn list_registration_requests(
    State(ctx): State<AuthContext>,
    admin: AuthUser,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<RegistrationRequest>>, (StatusCode, String)> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    list_registration_requests_core(&ctx, &admin, status)
        .await
        .into_response_error()
        .map(Json)
}

/// `userId` carries the registration request id handed out with the approval token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateTokenQuery {
    user_id: Option<String>,
    token: Option<String>,
    email: Option<String>,
}

async fn validate_token(
    State(ctx): State<AuthContext>,
    Query(query): Query<ValidateTokenQuery>,
) -> Response {
    let (Some(request_id), Some(token), Some(email)) = (query.user_id, query.token, query.email)
    else {
        return (
            StatusCode::BAD_REQUEST,
            "userId, token and email are required",
        )
            .into_response();
    };

    match validate_token_core(&ctx, &request_id, &token, &email).await {
        Ok(user_id) => Json(json!({ "valid": true, "userId": user_id })).into_response(),
        Err(AuthError::Unauthenticated | AuthError::Expired(_) | AuthError::NotFound(_)) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "valid": false })),
        )
            .into_response(),
        Err(e) => render(&e).into_response(),
    }
}
