use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::platform::{CommandApduExchange, CommandApduRequest, NfcPlatform};
use crate::Exchange;

/// How commands reach the card on the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Raw bytes through the link-layer transceive primitive
    Transceive,
    /// Request/reply objects through the structured command primitive
    CommandApdu,
}

impl TransportKind {
    /// Strategy the host stack of the build target expects
    pub fn platform_default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "ios")] {
                TransportKind::CommandApdu
            } else {
                TransportKind::Transceive
            }
        }
    }
}

impl Default for TransportKind {
    fn default() -> Self {
        Self::platform_default()
    }
}

pub struct TransceiveTransport<P> {
    platform: Arc<P>,
}

impl<P> TransceiveTransport<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl<P: NfcPlatform> Exchange for TransceiveTransport<P> {
    type Error = TransportError<P::Error>;

    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        debug!("[{:3}] => {}", command.len(), hex::encode(command));

        let answer = self
            .platform
            .transceive(command)
            .await
            .map_err(TransportError::Link)?;

        debug!("[{:3}] <= {}", answer.len(), hex::encode(&answer));
        Ok(answer)
    }
}

pub struct CommandApduTransport<P> {
    platform: Arc<P>,
}

impl<P> CommandApduTransport<P> {
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl<P: CommandApduExchange> Exchange for CommandApduTransport<P> {
    type Error = TransportError<P::Error>;

    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        debug!("[{:3}] => {}", command.len(), hex::encode(command));

        let reply = self
            .platform
            .send_command_apdu(CommandApduRequest::new(command))
            .await
            .map_err(TransportError::Link)?;

        let answer = reply.into_bytes();
        debug!("[{:3}] <= {}", answer.len(), hex::encode(&answer));
        Ok(answer)
    }
}

/// Transport strategy selected once, at configuration time
pub enum ApduTransport<P> {
    Transceive(TransceiveTransport<P>),
    CommandApdu(CommandApduTransport<P>),
}

impl<P> ApduTransport<P> {
    pub fn new(kind: TransportKind, platform: Arc<P>) -> Self {
        match kind {
            TransportKind::Transceive => Self::Transceive(TransceiveTransport::new(platform)),
            TransportKind::CommandApdu => Self::CommandApdu(CommandApduTransport::new(platform)),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Transceive(_) => TransportKind::Transceive,
            Self::CommandApdu(_) => TransportKind::CommandApdu,
        }
    }
}

#[async_trait]
impl<P: CommandApduExchange> Exchange for ApduTransport<P> {
    type Error = TransportError<P::Error>;

    async fn exchange(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        match self {
            Self::Transceive(t) => t.exchange(command).await,
            Self::CommandApdu(t) => t.exchange(command).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::mock::{MockCard, MockError, MockPlatform};
    use crate::{NfcTech, RequestOptions};

    const SELECT: [u8; 12] = [
        0x00, 0xA4, 0x04, 0x0C, 0x07, 0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01,
    ];

    fn engaged(card: MockCard) -> Arc<MockPlatform> {
        let platform = Arc::new(MockPlatform::with_card(card));
        block_on(async {
            platform.start().await.unwrap();
            platform
                .request_technology(NfcTech::IsoDep, &RequestOptions::default())
                .await
                .unwrap();
        });
        platform
    }

    #[test]
    fn strategies_return_identical_bytes() {
        for kind in [TransportKind::Transceive, TransportKind::CommandApdu] {
            let platform = engaged(
                MockCard::new([0xDE, 0xAD, 0xBE, 0xEF])
                    .respond([0x90, 0x00])
                    .respond([0x01, 0x02, 0x6A, 0x82]),
            );
            let transport = ApduTransport::new(kind, platform.clone());
            assert_eq!(transport.kind(), kind);

            assert_eq!(block_on(transport.exchange(&SELECT)).unwrap(), vec![0x90, 0x00]);
            assert_eq!(
                block_on(transport.exchange(&SELECT)).unwrap(),
                vec![0x01, 0x02, 0x6A, 0x82]
            );
            assert_eq!(platform.sent_commands(), vec![SELECT.to_vec(), SELECT.to_vec()]);
        }
    }

    #[test]
    fn link_fault_is_propagated_unchanged() {
        let platform = engaged(MockCard::new([0x01]).fail(MockError::TagLost));
        let transport = TransceiveTransport::new(platform);

        let err = block_on(transport.exchange(&SELECT)).unwrap_err();
        assert!(matches!(err, TransportError::Link(MockError::TagLost)));
        assert_eq!(err.link(), Some(&MockError::TagLost));
    }

    #[test]
    fn strategies_agree_on_unusual_frames() {
        let odd_command = [0x00, 0xA4];
        for kind in [TransportKind::Transceive, TransportKind::CommandApdu] {
            let platform = engaged(
                MockCard::new([0x01])
                    .respond(Vec::new())
                    .respond([0x6A])
                    .respond([0x90, 0x00]),
            );
            let transport = ApduTransport::new(kind, platform.clone());

            assert_eq!(block_on(transport.exchange(&SELECT)).unwrap(), Vec::<u8>::new());
            assert_eq!(block_on(transport.exchange(&SELECT)).unwrap(), vec![0x6A]);
            assert_eq!(
                block_on(transport.exchange(&odd_command)).unwrap(),
                vec![0x90, 0x00]
            );
            assert_eq!(platform.sent_commands()[2], odd_command.to_vec());
        }
    }

    #[test]
    fn exchange_apdu_serializes_first() {
        let platform = engaged(MockCard::new([0x01]).respond([0x90, 0x00]));
        let transport = TransceiveTransport::new(platform.clone());
        let command = nfc_apdu::APDUCommand {
            cla: 0x00,
            ins: 0xA4,
            p1: 0x04,
            p2: 0x0C,
            data: &SELECT[5..],
            le: None,
        };

        let answer = block_on(transport.exchange_apdu(&command)).unwrap();
        assert_eq!(answer, vec![0x90, 0x00]);
        assert_eq!(platform.sent_commands(), vec![SELECT.to_vec()]);
    }

    #[test]
    fn default_kind_matches_target() {
        #[cfg(not(target_os = "ios"))]
        assert_eq!(TransportKind::default(), TransportKind::Transceive);
        #[cfg(target_os = "ios")]
        assert_eq!(TransportKind::default(), TransportKind::CommandApdu);
    }
}
