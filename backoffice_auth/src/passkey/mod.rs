mod config;
mod errors;
mod main;
mod storage;
mod types;

pub use config::PasskeyConfig;
pub use errors::PasskeyError;
pub use main::{
    AllowCredential, AuthenticationOptions, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorResponse, AuthenticatorSelection,
    PubKeyCredParam, PublicKeyCredentialUserEntity, RegisterCredential, RegistrationOptions,
    RelyingParty,
};
pub use types::{DeviceType, PasskeyCredential};

pub(crate) use main::{
    VerifiedRegistration, finish_authentication, start_authentication, start_registration,
    verify_registration,
};
pub(crate) use storage::PasskeyStore;

#[cfg(test)]
pub(crate) use main::test_utils;
