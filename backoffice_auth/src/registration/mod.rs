//! Admin-reviewed registration queue and its single-use approval tokens.

mod config;
mod errors;
mod main;
mod storage;
mod types;

pub use config::RegistrationConfig;
pub use errors::RegistrationError;
pub use types::{ApprovedRegistration, RegistrationRequest, RequestStatus};

pub(crate) use main::{
    approve_registration, authorize_ceremony, consume_request, get_registration_request,
    link_identity, list_registration_requests, reject_registration, request_registration,
    validate_token,
};
pub(crate) use storage::RegistrationStore;
