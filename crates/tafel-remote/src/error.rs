//! Remote layer errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors produced by the realtime layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Malformed outbound payload, rejected before transmission.
    #[error("invalid payload '{0}'")]
    Validation(SmolStr),

    /// The underlying transport failed.
    #[error("transport error '{0}'")]
    Transport(SmolStr),

    /// No live connection; the operation was skipped.
    #[error("not connected")]
    NotConnected,

    /// Invalid connection endpoint.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(SmolStr),

    /// Inbound frame could not be parsed.
    #[error("malformed frame '{0}'")]
    MalformedFrame(SmolStr),
}
