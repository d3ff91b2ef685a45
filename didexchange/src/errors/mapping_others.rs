use crate::errors::error::{ExchangeError, ExchangeErrorKind};

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::from_msg(
            ExchangeErrorKind::UnmarshalFailed,
            format!("Invalid json: {}", err),
        )
    }
}
