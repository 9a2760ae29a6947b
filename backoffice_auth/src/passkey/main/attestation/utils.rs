use ciborium::value::Value as CborValue;

use crate::passkey::errors::PasskeyError;

use super::super::types::integer_to_i64;

/// `alg` and `sig` from an attestation statement.
pub(super) fn get_sig_from_stmt(
    att_stmt: &[(CborValue, CborValue)],
) -> Result<(i64, Vec<u8>), PasskeyError> {
    let mut alg = None;
    let mut sig = None;

    for (key, value) in att_stmt {
        match (key, value) {
            (CborValue::Text(k), CborValue::Integer(a)) if k == "alg" => {
                alg = Some(integer_to_i64(a)?)
            }
            (CborValue::Text(k), CborValue::Bytes(s)) if k == "sig" => sig = Some(s.clone()),
            _ => {}
        }
    }

    match (alg, sig) {
        (Some(a), Some(s)) => Ok((a, s)),
        _ => Err(PasskeyError::Verification(
            "Missing algorithm or signature in attestation statement".to_string(),
        )),
    }
}

/// DER certificates of `x5c`, leaf first. `None` when the statement has no chain.
pub(super) fn get_x5c_from_stmt(
    att_stmt: &[(CborValue, CborValue)],
) -> Result<Option<Vec<Vec<u8>>>, PasskeyError> {
    for (key, value) in att_stmt {
        if let (CborValue::Text(k), CborValue::Array(certs)) = (key, value) {
            if k != "x5c" {
                continue;
            }
            let chain = certs
                .iter()
                .map(|cert| match cert {
                    CborValue::Bytes(der) => Ok(der.clone()),
                    _ => Err(PasskeyError::Format("x5c entry is not a byte string".into())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if chain.is_empty() {
                return Err(PasskeyError::Format("x5c is empty".into()));
            }
            return Ok(Some(chain));
        }
    }
    Ok(None)
}

pub(super) fn has_ecdaa_key_id(att_stmt: &[(CborValue, CborValue)]) -> bool {
    att_stmt
        .iter()
        .any(|(k, _)| matches!(k, CborValue::Text(key) if key == "ecdaaKeyId"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_sig_from_stmt() {
        let stmt = vec![
            (CborValue::Text("alg".into()), CborValue::Integer((-7).into())),
            (CborValue::Text("sig".into()), CborValue::Bytes(vec![1, 2, 3])),
        ];
        assert_eq!(get_sig_from_stmt(&stmt).unwrap(), (-7, vec![1, 2, 3]));

        let missing = vec![(CborValue::Text("alg".into()), CborValue::Integer((-7).into()))];
        assert!(get_sig_from_stmt(&missing).is_err());
    }

    #[test]
    fn test_get_x5c_from_stmt() {
        assert_eq!(get_x5c_from_stmt(&[]).unwrap(), None);

        let stmt = vec![(
            CborValue::Text("x5c".into()),
            CborValue::Array(vec![CborValue::Bytes(vec![0x30, 0x00])]),
        )];
        assert_eq!(get_x5c_from_stmt(&stmt).unwrap(), Some(vec![vec![0x30, 0x00]]));

        let bad = vec![(
            CborValue::Text("x5c".into()),
            CborValue::Array(vec![CborValue::Text("pem".into())]),
        )];
        assert!(get_x5c_from_stmt(&bad).is_err());
    }
}
