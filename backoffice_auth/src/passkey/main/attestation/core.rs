use crate::passkey::errors::PasskeyError;

use super::super::types::{AttestationObject, AuthenticatorData};
use super::none::verify_none_attestation;
use super::packed::verify_packed_attestation;

/// Verify the attestation statement of a registration. Only `none` and `packed` are
/// accepted.
pub(in crate::passkey::main) fn verify_attestation(
    attestation: &AttestationObject,
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
) -> Result<(), PasskeyError> {
    match attestation.fmt.as_str() {
        "none" => {
            // for platform authenticators
            tracing::debug!("Using 'none' attestation format");
            verify_none_attestation(attestation)
        }
        "packed" => {
            tracing::debug!("Using 'packed' attestation format");
            verify_packed_attestation(auth_data, client_data_hash, &attestation.att_stmt)
        }
        other => Err(PasskeyError::Format(format!(
            "Unsupported attestation format: {other}"
        ))),
    }
}
