use backoffice_auth::{
    AuthError, ModulePermission, ModulePermissions, Operation, Principal, ResourceRequest,
    Role, RoleChangeRequest, RowFilter, authorize, change_role_core, row_filter,
};
use sqlx::{QueryBuilder, Sqlite};

use crate::common::{admin, context, login, onboard};

#[tokio::test]
async fn test_session_user_is_scoped_to_its_tenant() {
    let ctx = context().await;
    let email = "clerk@example.com";
    let (authenticator, user, _) = onboard(&ctx, email, Role::Staff, Some("hotel-1")).await;

    change_role_core(
        &ctx,
        &admin(),
        &user.id,
        RoleChangeRequest {
            role: Role::Staff,
            tenant_id: Some("hotel-1".to_string()),
            module_permissions: Some(
                ModulePermissions::new().with("bookings", ModulePermission::full()),
            ),
        },
    )
    .await
    .unwrap();
    let (user, _) = login(&ctx, &authenticator, email, 1).await.unwrap();
    let principal = Principal::from(&user);

    let own = ResourceRequest::new("bookings", Operation::Delete, Some("hotel-1".into()));
    let foreign = ResourceRequest::new("bookings", Operation::Read, Some("hotel-2".into()));
    let other_module = ResourceRequest::new("invoices", Operation::Read, Some("hotel-1".into()));

    assert_eq!(authorize(&principal, &own), Ok(()));
    assert_eq!(authorize(&principal, &foreign), Err(AuthError::TenantMismatch));
    assert_eq!(
        authorize(&principal, &other_module),
        Err(AuthError::PermissionDenied)
    );
}

#[tokio::test]
async fn test_row_filter_restricts_a_listing_query() {
    let ctx = context().await;
    let pool = ctx.data_store().as_sqlite().unwrap();
    sqlx::query("CREATE TABLE bookings (id INTEGER PRIMARY KEY, tenant_id TEXT)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO bookings (tenant_id) VALUES ('hotel-1'), ('hotel-1'), ('hotel-2')")
        .execute(pool)
        .await
        .unwrap();

    let principal = Principal {
        identity_id: "staff-1".into(),
        role: Role::Staff,
        tenant_id: Some("hotel-1".into()),
        module_permissions: ModulePermissions::new()
            .with("bookings", ModulePermission::read_only()),
    };

    let count = |filter: RowFilter| async move {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM bookings WHERE ");
        filter.push_to(&mut query, "tenant_id");
        let (n,): (i64,) = query.build_query_as().fetch_one(pool).await.unwrap();
        n
    };

    assert_eq!(count(row_filter(&principal, "bookings", Operation::Read)).await, 2);
    assert_eq!(count(row_filter(&principal, "bookings", Operation::Update)).await, 0);
    assert_eq!(count(row_filter(&Principal::from(&admin()), "bookings", Operation::Delete)).await, 3);
}
