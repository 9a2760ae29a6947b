use ciborium::value::Value as CborValue;
use ring::signature::{ECDSA_P256_SHA256_ASN1, UnparsedPublicKey};
use webpki::EndEntityCert;
use x509_parser::{certificate::X509Certificate, extensions::ParsedExtension, prelude::FromDer};

use crate::passkey::errors::PasskeyError;

use super::super::types::AuthenticatorData;
use super::utils::{get_sig_from_stmt, get_x5c_from_stmt, has_ecdaa_key_id};

/// id-fido-gen-ce-aaguid
const OID_FIDO_GEN_CE_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";
const ES256_ALG: i64 = -7;

/// Verify a `packed` statement: full attestation with an `x5c` chain, or self attestation
/// signed with the credential key itself.
pub(super) fn verify_packed_attestation(
    auth_data: &AuthenticatorData,
    client_data_hash: &[u8],
    att_stmt: &[(CborValue, CborValue)],
) -> Result<(), PasskeyError> {
    let (alg, sig) = get_sig_from_stmt(att_stmt)?;
    if alg != ES256_ALG {
        return Err(PasskeyError::Verification(format!(
            "Unsupported or unrecognized algorithm: {alg}"
        )));
    }

    if has_ecdaa_key_id(att_stmt) {
        return Err(PasskeyError::Verification(
            "ECDAA attestation not supported".to_string(),
        ));
    }

    let mut signed_data = Vec::with_capacity(auth_data.raw_data.len() + client_data_hash.len());
    signed_data.extend_from_slice(&auth_data.raw_data);
    signed_data.extend_from_slice(client_data_hash);

    match get_x5c_from_stmt(att_stmt)? {
        Some(x5c) => {
            tracing::debug!(chain_len = x5c.len(), "Full attestation with certificate chain");
            verify_x5c_attestation(auth_data, &x5c, &signed_data, &sig)
        }
        None => {
            tracing::debug!("Self attestation");
            verify_self_attestation(auth_data, &signed_data, &sig)
        }
    }
}

fn verify_x5c_attestation(
    auth_data: &AuthenticatorData,
    x5c: &[Vec<u8>],
    signed_data: &[u8],
    sig: &[u8],
) -> Result<(), PasskeyError> {
    let leaf = &x5c[0];
    let attestn_cert = EndEntityCert::try_from(leaf.as_slice()).map_err(|e| {
        PasskeyError::Verification(format!("Failed to parse attestation certificate: {e:?}"))
    })?;

    let (_, x509_cert) = X509Certificate::from_der(leaf).map_err(|e| {
        PasskeyError::Verification(format!("Failed to parse X509 certificate: {e}"))
    })?;
    verify_packed_attestation_cert(&x509_cert, auth_data)?;

    attestn_cert
        .verify_signature(&webpki::ECDSA_P256_SHA256, signed_data, sig)
        .map_err(|_| PasskeyError::Verification("Attestation signature invalid".to_string()))?;

    for der in &x5c[1..] {
        let (_, cert) = X509Certificate::from_der(der).map_err(|e| {
            PasskeyError::Verification(format!("Failed to parse certificate in chain: {e}"))
        })?;
        if !cert.validity().is_valid() {
            return Err(PasskeyError::Verification(
                "Certificate in chain is expired or not yet valid".to_string(),
            ));
        }
    }

    Ok(())
}

/// Attestation certificate requirements for the packed format.
fn verify_packed_attestation_cert(
    cert: &X509Certificate,
    auth_data: &AuthenticatorData,
) -> Result<(), PasskeyError> {
    if cert.version().0 != 2 {
        return Err(PasskeyError::Verification(
            "Attestation certificate must be version 3".to_string(),
        ));
    }

    if !cert.validity().is_valid() {
        return Err(PasskeyError::Verification(
            "Attestation certificate is expired or not yet valid".to_string(),
        ));
    }

    for ext in cert.extensions() {
        if ext.oid == oid_registry::OID_X509_EXT_BASIC_CONSTRAINTS {
            if let ParsedExtension::BasicConstraints(bc) = ext.parsed_extension() {
                if bc.ca {
                    return Err(PasskeyError::Verification(
                        "Certificate must not be a CA certificate".to_string(),
                    ));
                }
            }
        } else if ext.oid.to_id_string() == OID_FIDO_GEN_CE_AAGUID {
            // OCTET STRING (0x04) of length 16 (0x10)
            let value = ext.value;
            let Some(attested) = auth_data.attested.as_ref() else {
                return Err(PasskeyError::Verification(
                    "No attested credential data".to_string(),
                ));
            };
            if value.len() != 18 || value[..2] != [0x04, 0x10] || value[2..] != attested.aaguid {
                return Err(PasskeyError::Verification(
                    "AAGUID mismatch between certificate and authenticator data".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn verify_self_attestation(
    auth_data: &AuthenticatorData,
    signed_data: &[u8],
    signature: &[u8],
) -> Result<(), PasskeyError> {
    let attested = auth_data.attested.as_ref().ok_or_else(|| {
        PasskeyError::Verification("No attested credential data in self attestation".to_string())
    })?;

    let public_key = attested.public_key.to_uncompressed();
    UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, &public_key)
        .verify(signed_data, signature)
        .map_err(|_| {
            PasskeyError::Verification(
                "Self attestation signature verification failed".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::main::types::auth_data_flags;
    use crate::utils::sha256;
    use ring::rand::SystemRandom;
    use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};

    fn key_pair() -> EcdsaKeyPair {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng).unwrap()
    }

    fn auth_data_for(key: &EcdsaKeyPair) -> AuthenticatorData {
        let point = key.public_key().as_ref();
        let cose = CborValue::Map(vec![
            (CborValue::Integer(1.into()), CborValue::Integer(2.into())),
            (CborValue::Integer(3.into()), CborValue::Integer((-7).into())),
            (CborValue::Integer((-1).into()), CborValue::Integer(1.into())),
            (CborValue::Integer((-2).into()), CborValue::Bytes(point[1..33].to_vec())),
            (CborValue::Integer((-3).into()), CborValue::Bytes(point[33..65].to_vec())),
        ]);

        let mut data = sha256(b"example.com");
        data.push(auth_data_flags::UP | auth_data_flags::AT);
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&[0x00, 0x02, 0xca, 0xfe]);
        ciborium::ser::into_writer(&cose, &mut data).unwrap();
        AuthenticatorData::parse(data).unwrap()
    }

    fn stmt(alg: i64, sig: Vec<u8>) -> Vec<(CborValue, CborValue)> {
        vec![
            (CborValue::Text("alg".into()), CborValue::Integer(alg.into())),
            (CborValue::Text("sig".into()), CborValue::Bytes(sig)),
        ]
    }

    #[test]
    fn test_self_attestation_verifies_with_credential_key() {
        let key = key_pair();
        let auth_data = auth_data_for(&key);
        let client_data_hash = sha256(b"{}");

        let mut signed = auth_data.raw_data.clone();
        signed.extend_from_slice(&client_data_hash);
        let sig = key
            .sign(&SystemRandom::new(), &signed)
            .unwrap()
            .as_ref()
            .to_vec();

        assert!(verify_packed_attestation(&auth_data, &client_data_hash, &stmt(-7, sig)).is_ok());
    }

    #[test]
    fn test_self_attestation_rejects_foreign_signature() {
        let key = key_pair();
        let other = key_pair();
        let auth_data = auth_data_for(&key);
        let client_data_hash = sha256(b"{}");

        let mut signed = auth_data.raw_data.clone();
        signed.extend_from_slice(&client_data_hash);
        let sig = other
            .sign(&SystemRandom::new(), &signed)
            .unwrap()
            .as_ref()
            .to_vec();

        assert!(matches!(
            verify_packed_attestation(&auth_data, &client_data_hash, &stmt(-7, sig)),
            Err(PasskeyError::Verification(_))
        ));
    }

    #[test]
    fn test_packed_rejects_other_algorithms_and_ecdaa() {
        let key = key_pair();
        let auth_data = auth_data_for(&key);

        assert!(verify_packed_attestation(&auth_data, &[0; 32], &stmt(-257, vec![0])).is_err());

        let mut ecdaa = stmt(-7, vec![0]);
        ecdaa.push((CborValue::Text("ecdaaKeyId".into()), CborValue::Bytes(vec![1])));
        assert!(verify_packed_attestation(&auth_data, &[0; 32], &ecdaa).is_err());
    }

    #[test]
    fn test_x5c_with_garbage_certificate_is_rejected() {
        let key = key_pair();
        let auth_data = auth_data_for(&key);
        let mut statement = stmt(-7, vec![0]);
        statement.push((
            CborValue::Text("x5c".into()),
            CborValue::Array(vec![CborValue::Bytes(vec![0x30, 0x03, 0x01, 0x01, 0x00])]),
        ));
        assert!(matches!(
            verify_packed_attestation(&auth_data, &[0; 32], &statement),
            Err(PasskeyError::Verification(_))
        ));
    }
}
