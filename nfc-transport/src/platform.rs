//! Boundary to the host contactless stack
//!
//! The host performs radio-level discovery and polling. This crate only
//! consumes the few primitives below.

use std::fmt;

use async_trait::async_trait;
use nfc_apdu::{APDUCommand, APDUCommandError, StatusWord};
use serde::{Deserialize, Serialize};

/// Contactless link technologies a session can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NfcTech {
    /// ISO 14443-4, APDU-level transport
    IsoDep,
    /// ISO 14443-3A
    NfcA,
    /// ISO 14443-3B
    NfcB,
    /// JIS X 6319-4 (FeliCa)
    NfcF,
    /// ISO 15693
    NfcV,
}

impl NfcTech {
    /// Label shown to the operator
    pub fn label(&self) -> &'static str {
        match self {
            NfcTech::IsoDep => "ISO-DEP",
            NfcTech::NfcA => "NFC-A",
            NfcTech::NfcB => "NFC-B",
            NfcTech::NfcF => "NFC-F",
            NfcTech::NfcV => "NFC-V",
        }
    }
}

impl fmt::Display for NfcTech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Options passed along with a technology request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Hint the host may display while waiting for a card
    pub alert_message: Option<String>,
}

impl RequestOptions {
    pub fn with_alert_message(mut self, message: impl Into<String>) -> Self {
        self.alert_message = Some(message.into());
        self
    }
}

/// Primitives every host contactless stack provides
#[async_trait]
pub trait NfcPlatform: Send + Sync {
    /// Fault reported by the host stack
    type Error: std::error::Error + Send + Sync + 'static;

    /// Process-wide initialization. Calling it again once started is a no-op.
    async fn start(&self) -> Result<(), Self::Error>;

    /// Suspend until a card supporting `tech` is engaged, then hold it exclusively
    async fn request_technology(
        &self,
        tech: NfcTech,
        options: &RequestOptions,
    ) -> Result<NfcTech, Self::Error>;

    /// Identifier (UID / PUPI) of the engaged card
    async fn card_identifier(&self) -> Result<Vec<u8>, Self::Error>;

    /// Link-layer exchange of raw bytes
    async fn transceive(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Drop the engaged card, or abort a pending request
    async fn release_technology(&self) -> Result<(), Self::Error>;
}

/// Structured command/response primitive offered by some host stacks
#[async_trait]
pub trait CommandApduExchange: NfcPlatform {
    async fn send_command_apdu(
        &self,
        request: CommandApduRequest,
    ) -> Result<CommandApduReply, Self::Error>;
}

/// Request object handed to [`CommandApduExchange::send_command_apdu`]
///
/// The command bytes travel unchanged. Hosts that need the APDU fields
/// parse them with [`CommandApduRequest::apdu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandApduRequest {
    command: Vec<u8>,
}

impl CommandApduRequest {
    pub fn new(command: &[u8]) -> Self {
        Self {
            command: command.to_vec(),
        }
    }

    /// Command bytes, as handed to the transport
    pub fn as_bytes(&self) -> &[u8] {
        &self.command
    }

    /// Short APDU fields of the command
    pub fn apdu(&self) -> Result<APDUCommand<Vec<u8>>, APDUCommandError> {
        APDUCommand::from_bytes(&self.command)
    }
}

/// Structured reply: payload and status bytes reported separately
///
/// Answers shorter than a status word are kept whole in `response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandApduReply {
    /// Response data field
    pub response: Vec<u8>,
    /// SW1 SW2, absent when the card sent fewer than two bytes
    pub status: Option<[u8; 2]>,
}

impl CommandApduReply {
    /// Split a raw answer
    pub fn from_answer(answer: &[u8]) -> Self {
        match answer.len().checked_sub(2) {
            Some(at) => {
                let (response, sw) = answer.split_at(at);
                Self {
                    response: response.to_vec(),
                    status: Some([sw[0], sw[1]]),
                }
            }
            None => Self {
                response: answer.to_vec(),
                status: None,
            },
        }
    }

    pub fn status_word(&self) -> Option<StatusWord> {
        self.status.map(|[sw1, sw2]| StatusWord::from_bytes(sw1, sw2))
    }

    /// Normalize to the same bytes a raw transceive returns
    pub fn into_bytes(self) -> Vec<u8> {
        let mut answer = self.response;
        if let Some(sw) = self.status {
            answer.extend_from_slice(&sw);
        }
        answer
    }
}
