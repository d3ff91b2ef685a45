use diddoc::errors::error::{DiddocError, DiddocErrorKind};

use crate::errors::error::{ExchangeError, ExchangeErrorKind};

impl From<DiddocError> for ExchangeError {
    fn from(err: DiddocError) -> Self {
        let kind = match err.kind() {
            DiddocErrorKind::UnsupportedPublicKeyType => ExchangeErrorKind::PublicKeyNotSupported,
            DiddocErrorKind::InvalidState => ExchangeErrorKind::ServiceNotFound,
            DiddocErrorKind::InvalidVerkey | DiddocErrorKind::NotBase58 => ExchangeErrorKind::DecodePublicKey,
            DiddocErrorKind::InvalidJson | DiddocErrorKind::InvalidUrl => ExchangeErrorKind::UnmarshalFailed,
        };
        ExchangeError::from_msg(kind, err.to_string())
    }
}
