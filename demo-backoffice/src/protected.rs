//! A tenant-scoped sample module guarded by both authorization tiers.

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
};
use serde::Serialize;

use backoffice_auth::{Operation, Principal, ResourceRequest, authorize, row_filter};
use backoffice_auth_axum::{AuthContext, AuthUser, require_session_cookie};

const MODULE: &str = "bookings";

#[derive(Serialize)]
struct Booking {
    id: u32,
    tenant_id: &'static str,
    guest: &'static str,
}

static BOOKINGS: [Booking; 3] = [
    Booking { id: 1, tenant_id: "tenant-a", guest: "Ada" },
    Booking { id: 2, tenant_id: "tenant-a", guest: "Grace" },
    Booking { id: 3, tenant_id: "tenant-b", guest: "Linus" },
];

pub(super) fn router(ctx: AuthContext) -> Router {
    Router::new()
        .route("/", get(list_bookings))
        .route("/{id}", get(get_booking))
        .route_layer(from_fn_with_state(ctx.clone(), require_session_cookie))
        .with_state(ctx)
}

async fn list_bookings(user: AuthUser) -> Json<Vec<&'static Booking>> {
    let filter = row_filter(&Principal::from(&*user), MODULE, Operation::Read);
    Json(
        BOOKINGS
            .iter()
            .filter(|b| filter.matches(Some(b.tenant_id)))
            .collect(),
    )
}

async fn get_booking(
    user: AuthUser,
    Path(id): Path<u32>,
) -> Result<Json<&'static Booking>, StatusCode> {
    let booking = BOOKINGS
        .iter()
        .find(|b| b.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let request = ResourceRequest::new(MODULE, Operation::Read, Some(booking.tenant_id.to_string()));
    authorize(&Principal::from(&*user), &request).map_err(|_| StatusCode::FORBIDDEN)?;
    Ok(Json(booking))
}
