// SPDX-License-Identifier: Apache-2.0

//! Error types for the ICAO test application

use nfc_apdu::APDUCommandError;
use nfc_session::SessionError;
use thiserror::Error;

/// Errors surfaced to the operator by a test run
#[derive(Debug, Error)]
pub enum IcaoAppError<E> {
    /// Session lifecycle or transport failure
    #[error("{0}")]
    Session(#[from] SessionError<E>),

    /// The test command could not be serialized
    #[error("invalid command: {0}")]
    Command(#[from] APDUCommandError),
}

impl<E> IcaoAppError<E> {
    /// Check if the run was aborted by a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IcaoAppError::Session(e) if e.is_cancelled())
    }

    /// Check if the card link failed mid-exchange
    pub fn is_transport_error(&self) -> bool {
        matches!(self, IcaoAppError::Session(e) if e.is_transport())
    }

    /// Check if no session could be acquired
    pub fn is_acquisition_error(&self) -> bool {
        matches!(self, IcaoAppError::Session(e) if e.is_acquisition())
    }

    pub fn is_initialization_error(&self) -> bool {
        matches!(self, IcaoAppError::Session(e) if e.is_initialization())
    }

    /// Whether the run failed before any command reached the card
    pub fn before_exchange(&self) -> bool {
        self.is_acquisition_error() || self.is_initialization_error()
    }
}

impl<E> IcaoAppError<E>
where
    Self: std::error::Error,
{
    /// Message shown to the operator
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Errors raised while loading a [`crate::TestConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for test application operations
pub type IcaoAppResult<T, E> = Result<T, IcaoAppError<E>>;
