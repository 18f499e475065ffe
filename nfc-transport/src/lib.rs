use std::ops::Deref;

pub use async_trait::async_trait;
pub use nfc_apdu::{APDUAnswer, APDUCommand, APDUCommandError, StatusWord};

mod errors;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod platform;
mod strategy;

pub use errors::TransportError;
pub use platform::{
    CommandApduExchange, CommandApduReply, CommandApduRequest, NfcPlatform, NfcTech,
    RequestOptions,
};
pub use strategy::{ApduTransport, CommandApduTransport, TransceiveTransport, TransportKind};

/// Use to talk to the card engaged by the current technology session
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Error defined by the transport used
    type Error;

    /// Send raw command bytes and retrieve the raw answer, status word included
    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Serialize a command APDU and send it
    async fn exchange_apdu<I>(&self, command: &APDUCommand<I>) -> Result<Vec<u8>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
        Self::Error: From<APDUCommandError>,
    {
        let bytes = command.serialize()?;
        self.exchange(&bytes).await
    }
}
