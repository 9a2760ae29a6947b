use std::sync::Arc;

use backoffice_auth::{
    ApproveRegistrationBody, AuthConfig, AuthContext, AuthError, AuthenticationStartRequest,
    InMemoryCacheStore, IssuedSession, ModulePermissions, PasskeyConfig,
    RegistrationConfig, RegistrationFinishRequest, RegistrationRequestBody,
    RegistrationStartRequest, Role, SessionConfig, SessionUser, SqliteDataStore,
    approve_registration_core, handle_finish_authentication_core,
    handle_finish_registration_core, handle_start_authentication_core,
    handle_start_registration_core, request_registration_core, validate_token_core,
};

use super::MockAuthenticator;

pub const ORIGIN: &str = "https://backoffice.example.com";

pub fn test_config() -> AuthConfig {
    AuthConfig::new(
        PasskeyConfig::new(ORIGIN).unwrap(),
        SessionConfig::default(),
        RegistrationConfig::new(b"integration-test-secret-0123456789abcdef".to_vec()).unwrap(),
    )
}

pub async fn context_with(config: AuthConfig) -> AuthContext {
    let store = SqliteDataStore::in_memory().await.unwrap();
    let ctx = AuthContext::new(Arc::new(store), Box::new(InMemoryCacheStore::new()), config);
    ctx.init().await.unwrap();
    ctx
}

pub async fn context() -> AuthContext {
    context_with(test_config()).await
}

/// A caller the coordination layer treats as an admin.
pub fn admin() -> SessionUser {
    SessionUser {
        id: "admin-0".to_string(),
        email: "admin@example.com".to_string(),
        display_name: "Admin".to_string(),
        username: "admin".to_string(),
        role: Role::Admin,
        tenant_id: None,
        module_permissions: ModulePermissions::new(),
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    }
}

/// Request, approve and redeem. Returns the request id and the approval token.
pub async fn approved_request(
    ctx: &AuthContext,
    email: &str,
    role: Role,
    tenant_id: Option<&str>,
) -> (String, String) {
    let request_id = request_registration_core(
        ctx,
        RegistrationRequestBody {
            email: email.to_string(),
            display_name: "Integration User".to_string(),
            tenant_id: tenant_id.map(str::to_string),
        },
    )
    .await
    .unwrap();

    let approved = approve_registration_core(
        ctx,
        &admin(),
        ApproveRegistrationBody {
            request_id: request_id.clone(),
            role: Some(role),
            tenant_id: tenant_id.map(str::to_string),
        },
    )
    .await
    .unwrap();

    (request_id, approved.approval_token)
}

/// Run the registration ceremony for a redeemed request.
pub async fn complete_registration(
    ctx: &AuthContext,
    request_id: &str,
    token: &str,
) -> Result<(MockAuthenticator, SessionUser, IssuedSession), AuthError> {
    let options = handle_start_registration_core(
        ctx,
        RegistrationStartRequest {
            request_id: request_id.to_string(),
            token: token.to_string(),
        },
    )
    .await?;

    let authenticator = MockAuthenticator::new(ORIGIN);
    let (user, session) = handle_finish_registration_core(
        ctx,
        RegistrationFinishRequest {
            request_id: request_id.to_string(),
            credential: authenticator.create(&options.challenge),
        },
    )
    .await?;
    Ok((authenticator, user, session))
}

/// The whole onboarding path: request, approval, redemption and ceremony.
pub async fn onboard(
    ctx: &AuthContext,
    email: &str,
    role: Role,
    tenant_id: Option<&str>,
) -> (MockAuthenticator, SessionUser, IssuedSession) {
    let (request_id, token) = approved_request(ctx, email, role, tenant_id).await;
    validate_token_core(ctx, &request_id, &token, email)
        .await
        .unwrap();
    complete_registration(ctx, &request_id, &token).await.unwrap()
}

pub async fn login(
    ctx: &AuthContext,
    authenticator: &MockAuthenticator,
    email: &str,
    counter: u32,
) -> Result<(SessionUser, IssuedSession), AuthError> {
    let options = handle_start_authentication_core(
        ctx,
        AuthenticationStartRequest {
            email: email.to_string(),
            platform_authenticator_available: Some(true),
        },
        Some(ORIGIN),
    )
    .await?;
    let response = authenticator.get(&options.challenge, &options.auth_id, counter);
    handle_finish_authentication_core(ctx, &response).await
}
