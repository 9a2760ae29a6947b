use axum::{Json, extract::rejection::JsonRejection};
use backoffice_auth::AuthError;
use http::StatusCode;

pub(crate) const AUTH_FAILED: &str = "Authentication failed";
pub(crate) const FORBIDDEN: &str = "Forbidden";
const CONFLICT: &str = "Conflict";
const INTERNAL: &str = "Internal server error";

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;

    /// As [`IntoResponseError::into_response_error`], but a conflict renders as `400`.
    fn into_response_error_conflict_as_bad_request(self) -> Result<T, (StatusCode, String)>;
}

/// Status and body for an error. Failures a caller could use to probe for accounts or
/// resources share one body per status.
pub(crate) fn render(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::NotFound(_) | AuthError::Unauthenticated | AuthError::Expired(_) => {
            (StatusCode::UNAUTHORIZED, AUTH_FAILED.to_string())
        }
        AuthError::ReplayDetected => {
            tracing::warn!("Rejected replayed assertion");
            (StatusCode::UNAUTHORIZED, AUTH_FAILED.to_string())
        }
        AuthError::PermissionDenied | AuthError::TenantMismatch => {
            (StatusCode::FORBIDDEN, FORBIDDEN.to_string())
        }
        AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::Conflict(_) => (StatusCode::CONFLICT, CONFLICT.to_string()),
        AuthError::Storage(_) | AuthError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

/// Unwraps a JSON body, rendering every rejection as `400`.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, (StatusCode, String)> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        (StatusCode::BAD_REQUEST, rejection.body_text())
    })
}

impl<T> IntoResponseError<T> for Result<T, AuthError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| render(&e))
    }

    fn into_response_error_conflict_as_bad_request(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| match e {
            AuthError::Conflict(_) => (
                StatusCode::BAD_REQUEST,
                "Registration request could not be accepted".to_string(),
            ),
            other => render(&other),
        })
    }
}
