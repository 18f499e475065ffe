use nfc_apdu::APDUCommandError;
use thiserror::Error;

/// Failure of a single command/response exchange
///
/// Link faults are carried unchanged; nothing is retried or reinterpreted.
#[derive(Debug, Error)]
pub enum TransportError<E> {
    /// Fault raised by the host platform (tag lost, timeout, bad frame)
    #[error("link error: {0}")]
    Link(#[source] E),
    /// A command APDU could not be serialized
    #[error("malformed command: {0}")]
    MalformedCommand(#[from] APDUCommandError),
}

impl<E> TransportError<E> {
    /// Platform fault, if this is one
    pub fn link(&self) -> Option<&E> {
        match self {
            TransportError::Link(e) => Some(e),
            TransportError::MalformedCommand(_) => None,
        }
    }
}
