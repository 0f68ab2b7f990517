//! Probe module for ICMP liveness checks.
//!
//! Contains the echo wire codec, the raw transport abstraction and the prober
//! that ties them together.

mod echo;
mod ping;
mod transport;

pub use echo::*;
pub use ping::*;
pub use transport::*;

use crate::store::Outcome;
use std::io;
use thiserror::Error;

/// Probe error types, one per stage of the exchange.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connect error: {0}")]
    Connect(#[source] io::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[source] CodecError),
    #[error("send error: {0}")]
    Send(#[source] io::Error),
    #[error("read error: {0}")]
    Read(#[source] io::Error),
    #[error("parse error: {0}")]
    Parse(#[source] CodecError),
    #[error("probe aborted: {0}")]
    Aborted(String),
}

impl ProbeError {
    /// Classify the failure for storage.
    pub fn outcome(&self) -> Outcome {
        match self {
            ProbeError::Connect(_) => Outcome::ConnectError,
            ProbeError::Send(_) => Outcome::SendError,
            ProbeError::Read(_) => Outcome::ReadError,
            ProbeError::Parse(_) => Outcome::ParseError,
            ProbeError::Encode(_) | ProbeError::Aborted(_) => Outcome::Indeterminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let io_err = || io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(ProbeError::Connect(io_err()).outcome(), Outcome::ConnectError);
        assert_eq!(ProbeError::Send(io_err()).outcome(), Outcome::SendError);
        assert_eq!(ProbeError::Read(io_err()).outcome(), Outcome::ReadError);
        assert_eq!(
            ProbeError::Parse(CodecError::TooShort { len: 1 }).outcome(),
            Outcome::ParseError
        );
        assert_eq!(
            ProbeError::Encode(CodecError::TooLarge { len: 70_000 }).outcome(),
            Outcome::Indeterminate
        );
    }
}
