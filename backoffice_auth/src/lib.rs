//! backoffice_auth - identity core for multi-tenant back-office applications
//!
//! Admin-approved passkey registration, identity reconciliation across the authentication
//! and business records, server-side sessions and tenant-scoped authorization. The HTTP
//! surface lives in `backoffice_auth_axum`; everything here takes an [`AuthContext`].

mod authz;
mod config;
mod context;
mod coordination;
mod identity;
mod passkey;
mod registration;
mod session;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::{AUTH_ROUTE_PREFIX, AuthConfig};
pub use context::AuthContext;

pub use coordination::{
    ApproveRegistrationBody, AuthError, AuthenticationStartRequest, RegistrationFinishRequest,
    RegistrationRequestBody, RegistrationStartRequest, RoleChangeRequest,
    approve_registration_core, bootstrap_admin_core, change_role_core, correct_identity_email_core,
    delete_passkey_credential_core, get_session_user_core, handle_finish_authentication_core,
    handle_finish_registration_core, handle_start_authentication_core,
    handle_start_registration_core, list_credentials_core, list_malformed_identities_core,
    list_registration_requests_core, logout_core, reconcile_email_core, reject_registration_core,
    request_registration_core, validate_token_core,
};

pub use authz::{
    Decision, DenyReason, Operation, POLICY, Principal, ResourceRequest, RowFilter, Rule,
    SqlDialect, SqlFilter, authorize, decide, row_filter,
};

pub use identity::{
    AuthIdentity, BusinessIdentity, Identity, IdentityError, IdentitySeed, IdentityWrite,
    MalformedIdentity, ModulePermission, ModulePermissions, NormalizedEmail, ObservedIdentities,
    ReconcileOutcome, ReconcilePlan, Role, normalize_email, plan_reconciliation,
};

pub use passkey::{
    AuthenticationOptions, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    AuthenticatorResponse, DeviceType, PasskeyConfig, PasskeyCredential, RegisterCredential,
    RegistrationOptions,
};

pub use registration::{
    ApprovedRegistration, RegistrationConfig, RegistrationRequest, RequestStatus,
};

pub use session::{
    IssuedSession, SessionConfig, SessionError, SessionUser, purge_expired_sessions,
    revoke_all_sessions, session_token_from_headers, validate_session,
};

pub use storage::{
    CacheStore, DataStore, InMemoryCacheStore, PostgresDataStore, RedisCacheStore,
    SqliteDataStore, StorageError, StorePool,
};
