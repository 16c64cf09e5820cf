use thiserror::Error;

use crate::types::AlertDescription;

/// Errors raised by negotiation, record protection and session handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A fatal protocol failure. The connection must be torn down and the
    /// given alert sent to the peer.
    #[error("Fatal alert {0}: {1}")]
    FatalAlert(AlertDescription, String),

    /// Record authentication failed.
    ///
    /// Kept apart from [`Error::FatalAlert`] so callers can never branch on
    /// *why* a record failed to authenticate (MAC vs padding).
    #[error("Bad record MAC")]
    BadRecordMac,

    /// Caller supplied an argument outside the permitted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// API used in a state that does not allow the operation.
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

impl Error {
    pub(crate) fn alert(description: AlertDescription, msg: impl Into<String>) -> Self {
        Error::FatalAlert(description, msg.into())
    }

    pub(crate) fn illegal_parameter(msg: impl Into<String>) -> Self {
        Self::alert(AlertDescription::IllegalParameter, msg)
    }

    pub(crate) fn decode_error(msg: impl Into<String>) -> Self {
        Self::alert(AlertDescription::DecodeError, msg)
    }

    pub(crate) fn handshake_failure(msg: impl Into<String>) -> Self {
        Self::alert(AlertDescription::HandshakeFailure, msg)
    }

    pub(crate) fn internal_error(msg: impl Into<String>) -> Self {
        Self::alert(AlertDescription::InternalError, msg)
    }

    /// The alert that should be sent to the peer for this error, if any.
    ///
    /// Local precondition failures have no alert; they indicate misuse of
    /// the API rather than a peer fault.
    pub fn alert_description(&self) -> Option<AlertDescription> {
        match self {
            Error::FatalAlert(a, _) => Some(*a),
            Error::BadRecordMac => Some(AlertDescription::BadRecordMac),
            Error::InvalidArgument(_) | Error::IllegalState(_) => None,
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(value: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match value {
            nom::Err::Incomplete(_) => Error::decode_error("Incomplete input"),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                Error::decode_error(format!("Parse error: {:?}", e.code))
            }
        }
    }
}
