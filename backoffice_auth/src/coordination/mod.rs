//! Use-case coordination.
//!
//! Each function here drives the components for one operation and reports failures as
//! [`AuthError`]. The HTTP layer calls only into this module and the session helpers.
//!
//! - `registration`: request, approve, reject and token redemption
//! - `passkey`: registration and authentication ceremonies, credential management
//! - `session`: session lookup and logout
//! - `admin`: role changes and identity repair

mod admin;
mod auth_helpers;
mod errors;
mod passkey;
mod registration;
mod session;

pub use admin::{
    RoleChangeRequest, change_role_core, correct_identity_email_core,
    list_malformed_identities_core, reconcile_email_core,
};
pub use errors::AuthError;
pub use passkey::{
    AuthenticationStartRequest, RegistrationFinishRequest, RegistrationStartRequest,
    delete_passkey_credential_core, handle_finish_authentication_core,
    handle_finish_registration_core, handle_start_authentication_core,
    handle_start_registration_core, list_credentials_core,
};
pub use registration::{
    ApproveRegistrationBody, RegistrationRequestBody, approve_registration_core,
    bootstrap_admin_core,
    list_registration_requests_core, reject_registration_core, request_registration_core,
    validate_token_core,
};
pub use session::{get_session_user_core, logout_core};
