use nfc_transport::NfcTech;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PcscTransportError {
    /// `start` was never called, or failed
    #[error("PC/SC context not established")]
    NotStarted,
    /// No reader attached
    #[error("no PC/SC reader available")]
    NoReaderFound,
    /// Configured reader is not attached
    #[error("PC/SC reader `{0}` not found")]
    ReaderNotFound(String),
    /// Only ISO-DEP is reachable through PC/SC
    #[error("technology {0} is not supported over PC/SC")]
    Unsupported(NfcTech),
    /// A card is already engaged
    #[error("a card is already engaged")]
    Busy,
    /// Waiting for a card was aborted
    #[error("technology request cancelled")]
    Cancelled,
    /// No card engaged
    #[error("no card engaged")]
    NotConnected,
    /// Communication error
    #[error("PC/SC reader: communication error `{0}`")]
    Comm(&'static str),
    /// PC/SC error
    #[error("PC/SC reader: {0}")]
    Pcsc(#[from] pcsc::Error),
}
