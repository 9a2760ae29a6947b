use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::registration::errors::RegistrationError;
use crate::utils::{base64url_decode, base64url_encode};

type HmacSha256 = Hmac<Sha256>;

/// What an approval token asserts: which request, until when, and under which nonce.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TokenClaims {
    pub(crate) request_id: String,
    pub(crate) expires_at: i64,
    pub(crate) nonce: String,
}

impl TokenClaims {
    fn payload(&self) -> String {
        format!("{}.{}.{}", self.request_id, self.expires_at, self.nonce)
    }
}

fn mac(secret: &[u8], payload: &[u8]) -> Result<Vec<u8>, RegistrationError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| RegistrationError::Config("Invalid HMAC key".into()))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `base64url(payload) "." base64url(HMAC-SHA256(secret, payload))`
pub(crate) fn sign_token(secret: &[u8], claims: &TokenClaims) -> Result<String, RegistrationError> {
    let payload = claims.payload();
    let tag = mac(secret, payload.as_bytes())?;
    Ok(format!(
        "{}.{}",
        base64url_encode(payload.as_bytes()),
        base64url_encode(tag)
    ))
}

/// Check the MAC and decode the claims. Expiry and redemption are checked against storage.
pub(crate) fn verify_token(secret: &[u8], token: &str) -> Result<TokenClaims, RegistrationError> {
    let (payload_b64, tag_b64) = token
        .split_once('.')
        .ok_or(RegistrationError::InvalidToken)?;
    let payload = base64url_decode(payload_b64).map_err(|_| RegistrationError::InvalidToken)?;
    let tag = base64url_decode(tag_b64).map_err(|_| RegistrationError::InvalidToken)?;

    let expected = mac(secret, &payload)?;
    if !bool::from(expected.as_slice().ct_eq(tag.as_slice())) {
        tracing::debug!("Approval token MAC mismatch");
        return Err(RegistrationError::InvalidToken);
    }

    let payload = String::from_utf8(payload).map_err(|_| RegistrationError::InvalidToken)?;
    let mut parts = payload.splitn(3, '.');
    let (Some(request_id), Some(expires_at), Some(nonce)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(RegistrationError::InvalidToken);
    };

    Ok(TokenClaims {
        request_id: request_id.to_string(),
        expires_at: expires_at
            .parse()
            .map_err(|_| RegistrationError::InvalidToken)?,
        nonce: nonce.to_string(),
    })
}
