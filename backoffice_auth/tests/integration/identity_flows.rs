use backoffice_auth::{
    AuthContext, Role, RoleChangeRequest, change_role_core, correct_identity_email_core,
    list_malformed_identities_core, reconcile_email_core,
};
use chrono::Utc;

use crate::common::{admin, context, onboard};

const AUTH_TABLE: &str = "bo_auth_identities";
const BUSINESS_TABLE: &str = "bo_business_identities";

async fn insert_auth_record(ctx: &AuthContext, id: &str, email: &str, tenant_id: Option<&str>) {
    let pool = ctx.data_store().as_sqlite().unwrap();
    let now = Utc::now();
    sqlx::query(&format!(
        "INSERT INTO {AUTH_TABLE} (id, email, display_name, role, tenant_id, created_at, updated_at) VALUES (?, ?, 'Legacy', 'user', ?, ?, ?)"
    ))
    .bind(id)
    .bind(email)
    .bind(tenant_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

async fn count_rows(ctx: &AuthContext, table: &str) -> i64 {
    let pool = ctx.data_store().as_sqlite().unwrap();
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_business_record(
    ctx: &AuthContext,
    id: &str,
    email: &str,
    role: &str,
    tenant_id: Option<&str>,
) {
    let pool = ctx.data_store().as_sqlite().unwrap();
    let now = Utc::now();
    sqlx::query(&format!(
        "INSERT INTO {BUSINESS_TABLE} (id, email, username, role, tenant_id, module_permissions, is_active, auth_type, created_at, updated_at) VALUES (?, ?, ?, ?, ?, '{{}}', TRUE, 'legacy', ?, ?)"
    ))
    .bind(id)
    .bind(email)
    .bind("legacy-user")
    .bind(role)
    .bind(tenant_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

/// A business record without an auth record gains one with its role, tenant and id.
#[tokio::test]
async fn test_legacy_business_identity_is_linked() {
    let ctx = context().await;
    insert_business_record(&ctx, "legacy-1", "legacy@example.com", "partner", Some("hotel-9"))
        .await;

    let outcome = reconcile_email_core(&ctx, &admin(), "legacy@example.com")
        .await
        .unwrap();
    assert_eq!(outcome.identity.id, "legacy-1");
    assert_eq!(outcome.identity.role, Role::Partner);
    assert_eq!(outcome.identity.tenant_id.as_deref(), Some("hotel-9"));
    assert!(outcome.writes > 0);

    let again = reconcile_email_core(&ctx, &admin(), "legacy@example.com")
        .await
        .unwrap();
    assert_eq!(again.writes, 0);
    assert_eq!(again.identity.id, outcome.identity.id);
    assert_eq!(again.identity.role, Role::Partner);
}

/// Registering through the workflow links to the legacy business record instead of
/// creating a second identity.
#[tokio::test]
async fn test_registration_reuses_legacy_business_identity() {
    let ctx = context().await;
    insert_business_record(&ctx, "legacy-2", "legacy@example.com", "maintainer", Some("hotel-3"))
        .await;

    let (_, user, _) = onboard(&ctx, "legacy@example.com", Role::User, Some("hotel-3")).await;
    assert_eq!(user.id, "legacy-2");
    assert_eq!(user.role, Role::Maintainer);
}

/// Stored emails padded with non-space whitespace, or cased outside ASCII, still resolve to
/// the existing record instead of a second identity.
#[tokio::test]
async fn test_unnormalized_legacy_emails_are_reused() {
    let ctx = context().await;
    insert_auth_record(&ctx, "legacy-tab", "\tbob@example.com\n", Some("t1")).await;
    insert_business_record(&ctx, "legacy-accent", "ÉLISE@Example.com", "staff", Some("t2"))
        .await;

    let bob = reconcile_email_core(&ctx, &admin(), "bob@example.com")
        .await
        .unwrap();
    assert_eq!(bob.identity.id, "legacy-tab");
    assert_eq!(bob.identity.email, "bob@example.com");

    let elise = reconcile_email_core(&ctx, &admin(), " élise@example.com")
        .await
        .unwrap();
    assert_eq!(elise.identity.id, "legacy-accent");
    assert_eq!(elise.identity.role, Role::Staff);

    assert_eq!(count_rows(&ctx, AUTH_TABLE).await, 2);
    assert_eq!(count_rows(&ctx, BUSINESS_TABLE).await, 2);

    let again = reconcile_email_core(&ctx, &admin(), "ÉLISE@example.com")
        .await
        .unwrap();
    assert_eq!(again.writes, 0);
    assert_eq!(again.identity.id, "legacy-accent");
}

/// Records written without a lookup key get one on the next initialization.
#[tokio::test]
async fn test_init_keys_legacy_records() {
    let ctx = context().await;
    insert_auth_record(&ctx, "legacy-k", " Kim@Example.COM", Some("t1")).await;
    insert_business_record(&ctx, "legacy-bad", "not an email", "staff", Some("t1")).await;
    ctx.init().await.unwrap();

    let pool = ctx.data_store().as_sqlite().unwrap();
    let key: Option<String> = sqlx::query_scalar(&format!(
        "SELECT email_norm FROM {AUTH_TABLE} WHERE id = 'legacy-k'"
    ))
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(key.as_deref(), Some("kim@example.com"));

    let key: Option<String> = sqlx::query_scalar(&format!(
        "SELECT email_norm FROM {BUSINESS_TABLE} WHERE id = 'legacy-bad'"
    ))
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(key, None);
}

#[tokio::test]
async fn test_malformed_email_is_listed_and_corrected() {
    let ctx = context().await;
    insert_business_record(&ctx, "broken-1", "broken at example", "staff", Some("t1")).await;

    let malformed = list_malformed_identities_core(&ctx, &admin()).await.unwrap();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].id, "broken-1");

    let fixed = correct_identity_email_core(&ctx, &admin(), "broken-1", "fixed@example.com")
        .await
        .unwrap();
    assert_eq!(fixed.id, "broken-1");
    assert_eq!(fixed.email, "fixed@example.com");
    assert!(
        list_malformed_identities_core(&ctx, &admin())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_role_change_applies_to_both_records() {
    let ctx = context().await;
    let (_, user, _) = onboard(&ctx, "promote@example.com", Role::User, Some("t1")).await;

    let changed = change_role_core(
        &ctx,
        &admin(),
        &user.id,
        RoleChangeRequest {
            role: Role::Admin,
            tenant_id: None,
            module_permissions: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(changed.role, Role::Admin);

    let outcome = reconcile_email_core(&ctx, &admin(), "promote@example.com")
        .await
        .unwrap();
    assert_eq!(outcome.writes, 0);
    assert_eq!(outcome.identity.role, Role::Admin);
    assert_eq!(outcome.identity.tenant_id, None);
}
