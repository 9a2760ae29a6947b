use backoffice_auth::{
    AuthError, RegistrationRequestBody, RequestStatus, Role, get_session_user_core,
    list_credentials_core, list_registration_requests_core, reject_registration_core,
    request_registration_core, validate_token_core,
};

use crate::common::{admin, approved_request, complete_registration, context, login, onboard};

/// Request, approval, ceremony, reconciliation, login and a replayed login.
#[tokio::test]
async fn test_registration_to_login_end_to_end() {
    let ctx = context().await;
    let email = "new@example.com";

    let (authenticator, registered, session) =
        onboard(&ctx, email, Role::Staff, Some("hotel-1")).await;
    assert_eq!(registered.email, email);
    assert_eq!(registered.role, Role::Staff);
    assert_eq!(registered.tenant_id.as_deref(), Some("hotel-1"));
    assert!(!session.token.is_empty());

    // the auth and business records share one id
    let outcome = backoffice_auth::reconcile_email_core(&ctx, &admin(), email)
        .await
        .unwrap();
    assert_eq!(outcome.identity.id, registered.id);
    assert_eq!(outcome.writes, 0);

    let credentials = list_credentials_core(&ctx, &registered).await.unwrap();
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].external_credential_id, authenticator.credential_id());

    let (user, issued) = login(&ctx, &authenticator, email, 1).await.unwrap();
    assert_eq!(user.id, registered.id);
    assert!(issued.headers.contains_key(http::header::SET_COOKIE));

    let replay = login(&ctx, &authenticator, email, 1).await;
    assert_eq!(replay.unwrap_err(), AuthError::ReplayDetected);

    let (_, _) = login(&ctx, &authenticator, email, 2).await.unwrap();

    let requests = list_registration_requests_core(&ctx, &admin(), Some(RequestStatus::Approved))
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].consumed_at.is_some());
    assert_eq!(requests[0].auth_identity_id.as_deref(), Some(registered.id.as_str()));
}

#[tokio::test]
async fn test_concurrent_token_redemption_succeeds_once() {
    let ctx = context().await;
    let email = "race@example.com";
    let (request_id, token) = approved_request(&ctx, email, Role::User, Some("t1")).await;

    let (first, second) = tokio::join!(
        validate_token_core(&ctx, &request_id, &token, email),
        validate_token_core(&ctx, &request_id, &token, email),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(AuthError::Unauthenticated)))
    );
}

#[tokio::test]
async fn test_token_for_another_email_is_rejected() {
    let ctx = context().await;
    let (request_id, token) = approved_request(&ctx, "a@example.com", Role::User, Some("t1")).await;

    assert_eq!(
        validate_token_core(&ctx, &request_id, &token, "b@example.com").await,
        Err(AuthError::Unauthenticated)
    );
    // a failed attempt does not burn the token
    assert!(
        validate_token_core(&ctx, &request_id, &token, "A@Example.com")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_ceremony_requires_redeemed_token() {
    let ctx = context().await;
    let (request_id, token) = approved_request(&ctx, "early@example.com", Role::User, Some("t1")).await;

    let early = complete_registration(&ctx, &request_id, &token).await;
    assert!(matches!(early, Err(AuthError::Unauthenticated)));
}

#[tokio::test]
async fn test_request_binds_at_most_one_credential() {
    let ctx = context().await;
    let email = "once@example.com";
    let (request_id, token) = approved_request(&ctx, email, Role::User, Some("t1")).await;
    validate_token_core(&ctx, &request_id, &token, email)
        .await
        .unwrap();
    complete_registration(&ctx, &request_id, &token)
        .await
        .unwrap();

    let again = complete_registration(&ctx, &request_id, &token).await;
    assert!(matches!(again, Err(AuthError::Unauthenticated)));
}

#[tokio::test]
async fn test_rejected_request_token_stops_working() {
    let ctx = context().await;
    let email = "rejected@example.com";
    let (request_id, token) = approved_request(&ctx, email, Role::User, Some("t1")).await;

    reject_registration_core(&ctx, &admin(), &request_id)
        .await
        .unwrap();
    assert_eq!(
        validate_token_core(&ctx, &request_id, &token, email).await,
        Err(AuthError::Unauthenticated)
    );

    // a fresh request is accepted once the old one is decided
    assert!(
        request_registration_core(
            &ctx,
            RegistrationRequestBody {
                email: email.to_string(),
                display_name: "Second try".to_string(),
                tenant_id: Some("t1".to_string()),
            },
        )
        .await
        .is_ok()
    );
}

#[tokio::test]
async fn test_registered_email_cannot_request_again() {
    let ctx = context().await;
    let (_, user, session) = onboard(&ctx, "taken@example.com", Role::User, Some("t1")).await;

    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::COOKIE,
        format!("{}={}", ctx.config().session.cookie_name, session.token)
            .parse()
            .unwrap(),
    );
    assert_eq!(get_session_user_core(&ctx, &headers).await.unwrap().id, user.id);

    let duplicate = request_registration_core(
        &ctx,
        RegistrationRequestBody {
            email: "Taken@example.com ".to_string(),
            display_name: "Again".to_string(),
            tenant_id: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AuthError::Conflict(_))));
}
