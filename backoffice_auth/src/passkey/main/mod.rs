mod attestation;
mod auth;
mod challenge;
mod register;
#[cfg(test)]
pub(crate) mod test_utils;
mod types;

pub use types::{
    AllowCredential, AuthenticationOptions, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorResponse, AuthenticatorSelection,
    PubKeyCredParam, PublicKeyCredentialUserEntity, RegisterCredential, RegistrationOptions,
    RelyingParty,
};

pub(crate) use auth::{finish_authentication, start_authentication};
pub(crate) use register::{VerifiedRegistration, start_registration, verify_registration};
