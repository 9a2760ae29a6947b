use std::time::Duration;

use backoffice_auth::{
    AuthError, Role, RoleChangeRequest, SessionConfig, change_role_core, get_session_user_core,
    logout_core,
};
use http::HeaderMap;
use http::header::COOKIE;

use crate::common::{admin, context, context_with, login, onboard, test_config};

fn cookie(name: &str, token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, format!("{name}={token}").parse().unwrap());
    headers
}

#[tokio::test]
async fn test_session_expires() {
    let mut config = test_config();
    config.session = SessionConfig {
        max_age: 1,
        ..SessionConfig::default()
    };
    let ctx = context_with(config).await;
    let (_, _, session) = onboard(&ctx, "brief@example.com", Role::User, Some("t1")).await;
    let headers = cookie(&ctx.config().session.cookie_name, &session.token);

    assert!(get_session_user_core(&ctx, &headers).await.is_ok());
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(
        get_session_user_core(&ctx, &headers).await,
        Err(AuthError::Unauthenticated)
    );
}

#[tokio::test]
async fn test_role_change_revokes_every_session() {
    let ctx = context().await;
    let email = "demote@example.com";
    let (authenticator, user, first) = onboard(&ctx, email, Role::Staff, Some("t1")).await;
    let (_, second) = login(&ctx, &authenticator, email, 1).await.unwrap();
    let name = ctx.config().session.cookie_name.clone();

    change_role_core(
        &ctx,
        &admin(),
        &user.id,
        RoleChangeRequest {
            role: Role::User,
            tenant_id: Some("t1".to_string()),
            module_permissions: None,
        },
    )
    .await
    .unwrap();

    for token in [&first.token, &second.token] {
        assert_eq!(
            get_session_user_core(&ctx, &cookie(&name, token)).await,
            Err(AuthError::Unauthenticated)
        );
    }

    let (fresh, _) = login(&ctx, &authenticator, email, 2).await.unwrap();
    assert_eq!(fresh.role, Role::User);
}

#[tokio::test]
async fn test_logout_ends_only_that_session() {
    let ctx = context().await;
    let email = "multi@example.com";
    let (authenticator, _, first) = onboard(&ctx, email, Role::Staff, Some("t1")).await;
    let (_, second) = login(&ctx, &authenticator, email, 1).await.unwrap();
    let name = ctx.config().session.cookie_name.clone();

    logout_core(&ctx, &cookie(&name, &first.token)).await.unwrap();

    assert!(get_session_user_core(&ctx, &cookie(&name, &first.token)).await.is_err());
    assert!(get_session_user_core(&ctx, &cookie(&name, &second.token)).await.is_ok());
}
