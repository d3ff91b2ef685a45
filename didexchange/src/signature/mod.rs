use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use messages::didexchange::request::ConnectionData;
use messages::didexchange::response::ConnectionSignature;

use crate::errors::error::prelude::*;
use crate::wallet::BaseWallet;

/// Separates the timestamp prefix from the connection attribute bytes inside
/// the signed payload.
pub const SIG_DATA_DELIMITER: u8 = b'|';

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

fn decode_verkey_bytes(verkey: &str) -> ExchangeResult<Vec<u8>> {
    bs58::decode(verkey).into_vec().map_err(|err| {
        ExchangeError::from_msg(
            ExchangeErrorKind::DecodePublicKey,
            format!("Verkey {} is not base58: {}", verkey, err),
        )
    })
}

/// Builds a detached signature over `timestamp | JSON(connection)`. The
/// timestamp keeps previously issued signatures from being replayed; the
/// asserted verkey travels with the signature so the recipient can verify
/// before it has resolved any key material of ours.
pub async fn prepare_connection_signature(
    wallet: &Arc<dyn BaseWallet>,
    connection: &ConnectionData,
    verkey: &str,
) -> ExchangeResult<ConnectionSignature> {
    let connection_json = serde_json::to_string(connection)?;

    let mut sig_data = unix_timestamp().to_string().into_bytes();
    sig_data.push(SIG_DATA_DELIMITER);
    sig_data.extend(connection_json.as_bytes());

    let signature = wallet.sign(verkey, &sig_data).await?;
    let verkey_bytes = decode_verkey_bytes(verkey)?;

    Ok(ConnectionSignature::new(
        base64::encode_config(&sig_data, base64::URL_SAFE),
        base64::encode_config(&signature, base64::URL_SAFE),
        base64::encode_config(&verkey_bytes, base64::URL_SAFE),
    ))
}

/// Verifies a connection signature and returns the connection it asserts.
///
/// The signature must verify under the key carried in `sign_ver_key`, and
/// that key must be one of the public keys named by the signed DID Document
/// itself; anything else is a `SignatureMismatch`.
pub async fn verify_connection_signature(
    wallet: &Arc<dyn BaseWallet>,
    connection_sig: &ConnectionSignature,
) -> ExchangeResult<ConnectionData> {
    if connection_sig.sig_data.is_empty()
        || connection_sig.signature.is_empty()
        || connection_sig.sign_ver_key.is_empty()
    {
        return Err(ExchangeError::from_msg(
            ExchangeErrorKind::MissingOrInvalidSignatureData,
            "Connection signature is missing sig_data, signature or sign_ver_key",
        ));
    }

    let sig_data = base64::decode_config(connection_sig.sig_data.as_bytes(), base64::URL_SAFE).map_err(|err| {
        ExchangeError::from_msg(
            ExchangeErrorKind::DecodeSignedData,
            format!("Cannot decode signed data: {}", err),
        )
    })?;

    let signature = base64::decode_config(connection_sig.signature.as_bytes(), base64::URL_SAFE).map_err(|err| {
        ExchangeError::from_msg(
            ExchangeErrorKind::DecodeSignature,
            format!("Cannot decode signature: {}", err),
        )
    })?;

    let verkey_bytes =
        base64::decode_config(connection_sig.sign_ver_key.as_bytes(), base64::URL_SAFE).map_err(|err| {
            ExchangeError::from_msg(
                ExchangeErrorKind::DecodePublicKey,
                format!("Cannot decode signature verification key: {}", err),
            )
        })?;

    if !wallet.verify(&verkey_bytes, &sig_data, &signature).await? {
        return Err(ExchangeError::from_msg(
            ExchangeErrorKind::SignatureMismatch,
            "Connection signature is invalid under the asserted verification key",
        ));
    }

    let delimiter_index = sig_data
        .iter()
        .position(|byte| *byte == SIG_DATA_DELIMITER)
        .ok_or(ExchangeError::from_msg(
            ExchangeErrorKind::MissingConnectionAttributeBytes,
            "Signed data carries no payload delimiter",
        ))?;

    let connection_bytes = &sig_data[delimiter_index + 1..];
    if connection_bytes.is_empty() {
        return Err(ExchangeError::from_msg(
            ExchangeErrorKind::MissingConnectionAttributeBytes,
            "Signed data carries no connection attribute bytes",
        ));
    }

    let connection: ConnectionData = serde_json::from_slice(connection_bytes).map_err(|err| {
        ExchangeError::from_msg(
            ExchangeErrorKind::UnmarshalFailed,
            format!("Cannot unmarshal connection attribute bytes: {}", err),
        )
    })?;

    let key_is_asserted = connection
        .did_doc
        .public_key
        .iter()
        .filter_map(|key| bs58::decode(&key.public_key_base_58).into_vec().ok())
        .any(|key| key == verkey_bytes);
    if !key_is_asserted {
        return Err(ExchangeError::from_msg(
            ExchangeErrorKind::SignatureMismatch,
            "Signature verification key is not asserted by the signed DID Document",
        ));
    }

    Ok(connection)
}
