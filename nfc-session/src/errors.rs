use nfc_transport::TransportError;
use thiserror::Error;

use crate::state::{SessionId, SessionState};

/// The host contactless stack could not be started
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("NFC stack failed to start: {reason}")]
pub struct InitializationError {
    pub reason: String,
}

/// No session could be acquired
#[derive(Debug, Error)]
pub enum AcquisitionError<E> {
    /// `start` has not succeeded
    #[error("NFC stack is not initialized")]
    NotInitialized,
    /// Another session is acquiring or acquired
    #[error("another technology request is outstanding")]
    Busy,
    /// The session was released while waiting for a card
    #[error("technology request cancelled")]
    Cancelled,
    /// The host reported no matching card
    #[error("no matching card: {0}")]
    Platform(#[source] E),
}

/// Operation attempted outside an acquired session
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("session {session} is {actual}, expected {expected}")]
pub struct SessionStateError {
    pub session: SessionId,
    pub expected: SessionState,
    pub actual: SessionState,
}

/// Error taxonomy of the session layer
#[derive(Debug, Error)]
pub enum SessionError<E> {
    #[error("initialization error: {0}")]
    Initialization(#[from] InitializationError),

    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError<E>),

    #[error("session state error: {0}")]
    SessionState(#[from] SessionStateError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError<E>),
}

impl<E> SessionError<E> {
    pub fn is_initialization(&self) -> bool {
        matches!(self, SessionError::Initialization(_))
    }

    pub fn is_acquisition(&self) -> bool {
        matches!(self, SessionError::Acquisition(_))
    }

    pub fn is_session_state(&self) -> bool {
        matches!(self, SessionError::SessionState(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }

    /// Acquisition was aborted by a release rather than by the host
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Acquisition(AcquisitionError::Cancelled))
    }
}

/// Result type alias for session operations
pub type SessionResult<T, E> = Result<T, SessionError<E>>;
