use crate::errors::error::{DiddocError, DiddocErrorKind, DiddocResult};

pub const ED25519_VERKEY_LENGTH: usize = 32;

pub fn validate_verkey(verkey: &str) -> DiddocResult<String> {
    let bytes = decode_verkey(verkey)?;

    if bytes.len() != ED25519_VERKEY_LENGTH {
        return Err(DiddocError::from_msg(
            DiddocErrorKind::InvalidVerkey,
            format!(
                "Invalid verkey length, expected {} bytes, got {}",
                ED25519_VERKEY_LENGTH,
                bytes.len()
            ),
        ));
    }

    Ok(verkey.to_string())
}

pub fn decode_verkey(verkey: &str) -> DiddocResult<Vec<u8>> {
    bs58::decode(verkey).into_vec().map_err(|err| {
        DiddocError::from_msg(
            DiddocErrorKind::NotBase58,
            format!("Verkey \"{}\" is not base58: {}", verkey, err),
        )
    })
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_accepts_32_byte_base58_value() {
        validate_verkey(&bs58::encode([5u8; ED25519_VERKEY_LENGTH]).into_string()).unwrap();
    }

    #[test]
    fn test_rejects_non_base58_value() {
        let err = validate_verkey("0OIl+/").unwrap_err();
        assert_eq!(err.kind(), DiddocErrorKind::NotBase58);
    }

    #[test]
    fn test_rejects_wrong_length_value() {
        let err = validate_verkey(&bs58::encode([5u8; 16]).into_string()).unwrap_err();
        assert_eq!(err.kind(), DiddocErrorKind::InvalidVerkey);
    }
}
