use std::{error::Error, fmt};

pub mod prelude {
    pub use super::{err_msg, ExchangeError, ExchangeErrorKind, ExchangeResult};
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum ExchangeErrorKind {
    // Message handling
    #[error("Unrecognized message type")]
    UnrecognizedMsgType,
    #[error("Unknown state name")]
    UnknownState,
    #[error("State transition is not allowed")]
    IllegalTransition,
    #[error("No connection record matches the message thread")]
    UnknownThread,
    #[error("Object is in invalid state for requested operation")]
    InvalidState,

    // Connection signature
    #[error("Cannot decode signed data")]
    DecodeSignedData,
    #[error("Cannot decode signature")]
    DecodeSignature,
    #[error("Cannot decode public key")]
    DecodePublicKey,
    #[error("Signature does not verify under the asserted key")]
    SignatureMismatch,
    #[error("Missing or invalid signature data")]
    MissingOrInvalidSignatureData,
    #[error("No connection attribute bytes found after the payload delimiter")]
    MissingConnectionAttributeBytes,
    #[error("Invalid JSON string")]
    UnmarshalFailed,

    // DID Documents
    #[error("Public key type is not supported")]
    PublicKeyNotSupported,
    #[error("No service found on DID Document")]
    ServiceNotFound,
    #[error("DID resolution failed")]
    DidResolveFailed,

    // Collaborators
    #[error("Message dispatch failed")]
    DispatchFailed,
    #[error("Store backend failure")]
    StoreIo,
    #[error("Record not found")]
    NotFound,
    #[error("Record already exists in the store")]
    Conflict,

    #[error("Not implemented")]
    NotImplemented,
}

impl ExchangeErrorKind {
    /// Transient failures do not advance protocol state and may be retried by
    /// the transport caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeErrorKind::DispatchFailed | ExchangeErrorKind::StoreIo)
    }
}

#[derive(thiserror::Error)]
pub struct ExchangeError {
    msg: String,
    kind: ExchangeErrorKind,
}

fn format_error(err: &ExchangeError, f: &mut fmt::Formatter) -> fmt::Result {
    writeln!(f, "Error: {}", err.msg())?;
    let mut current = err.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        format_error(self, f)
    }
}

impl fmt::Debug for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        format_error(self, f)
    }
}

impl ExchangeError {
    pub fn from_msg<D>(kind: ExchangeErrorKind, msg: D) -> ExchangeError
    where
        D: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        ExchangeError {
            msg: msg.to_string(),
            kind,
        }
    }

    pub fn kind(&self) -> ExchangeErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn extend<D>(self, msg: D) -> ExchangeError
    where
        D: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        ExchangeError {
            msg: format!("{}\n{}", self.msg, msg),
            kind: self.kind,
        }
    }
}

pub fn err_msg<D>(kind: ExchangeErrorKind, msg: D) -> ExchangeError
where
    D: fmt::Display + fmt::Debug + Send + Sync + 'static,
{
    ExchangeError::from_msg(kind, msg)
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
