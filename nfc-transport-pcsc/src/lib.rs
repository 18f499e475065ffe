mod config;
mod errors;

use std::{
    ffi::{CStr, CString},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

pub use config::{PcscConfig, ShareMode};
pub use errors::PcscTransportError;
pub use pcsc;

use log::{debug, info};
use nfc_apdu::{APDUAnswer, StatusWord};
use nfc_transport::{
    async_trait, CommandApduExchange, CommandApduReply, CommandApduRequest, NfcPlatform, NfcTech,
    RequestOptions,
};
use pcsc::{Card, Context, Disposition, Protocols, ReaderState, Scope, State};

/// PC/SC part 3 GET DATA pseudo-APDU returning the contactless UID
pub const GET_UID_COMMAND: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// NFC host platform backed by a PC/SC contactless reader
///
/// Every call blocks the current thread while the reader works. A pending
/// technology request wakes up every `poll_interval` and is aborted by any
/// `release_technology` issued after it started, from another thread.
pub struct TransportNativePcsc {
    config: PcscConfig,
    context: Mutex<Option<Context>>,
    card: Mutex<Option<Card>>,
    /// Bumped by every release; a request is superseded once it moves on
    generation: AtomicU64,
}

impl TransportNativePcsc {
    pub fn new(config: PcscConfig) -> Self {
        TransportNativePcsc {
            config,
            context: Mutex::new(None),
            card: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Names of the attached readers
    pub fn list_readers(&self) -> Result<Vec<String>, PcscTransportError> {
        let readers = self.context()?.list_readers_owned()?;
        Ok(readers
            .iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect())
    }

    fn context(&self) -> Result<Context, PcscTransportError> {
        self.context
            .lock()
            .expect("PC/SC context poisoned")
            .clone()
            .ok_or(PcscTransportError::NotStarted)
    }

    fn select_reader(&self, context: &Context) -> Result<CString, PcscTransportError> {
        let readers = context.list_readers_owned().map_err(|e| match e {
            pcsc::Error::NoReadersAvailable => PcscTransportError::NoReaderFound,
            e => e.into(),
        })?;

        match &self.config.reader {
            Some(wanted) => readers
                .into_iter()
                .find(|r| matches_reader(r, wanted))
                .ok_or_else(|| PcscTransportError::ReaderNotFound(wanted.clone())),
            None => readers
                .into_iter()
                .next()
                .ok_or(PcscTransportError::NoReaderFound),
        }
    }

    fn ticket(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_superseded(&self, ticket: u64) -> bool {
        self.ticket() != ticket
    }

    fn wait_for_card(
        &self,
        context: &Context,
        ticket: u64,
    ) -> Result<CString, PcscTransportError> {
        let reader = self.select_reader(context)?;
        info!("waiting for a card on {}", reader.to_string_lossy());

        let mut states = [ReaderState::new(reader.clone(), State::UNAWARE)];
        loop {
            if self.is_superseded(ticket) {
                return Err(PcscTransportError::Cancelled);
            }

            match context.get_status_change(Some(self.config.poll_interval), &mut states) {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => continue,
                Err(pcsc::Error::Cancelled) => return Err(PcscTransportError::Cancelled),
                Err(e) => return Err(e.into()),
            }

            let event = states[0].event_state();
            if event.contains(State::PRESENT) && !event.contains(State::MUTE) {
                return Ok(reader);
            }
            states[0].sync_current_state();
        }
    }

    fn transmit(card: &Card, command: &[u8]) -> Result<Vec<u8>, PcscTransportError> {
        info!("[{:3}] >> {:}", command.len(), hex::encode(command));

        let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE_EXTENDED];
        let answer = card.transmit(command, &mut buffer)?;

        info!("[{:3}] << {:}", answer.len(), hex::encode(answer));
        Ok(answer.to_vec())
    }

    fn with_card<T>(
        &self,
        f: impl FnOnce(&Card) -> Result<T, PcscTransportError>,
    ) -> Result<T, PcscTransportError> {
        let card = self.card.lock().expect("PC/SC card poisoned");
        let card = card.as_ref().ok_or(PcscTransportError::NotConnected)?;
        f(card)
    }
}

impl Default for TransportNativePcsc {
    fn default() -> Self {
        Self::new(PcscConfig::default())
    }
}

fn matches_reader(reader: &CStr, wanted: &str) -> bool {
    reader
        .to_string_lossy()
        .to_lowercase()
        .contains(&wanted.to_lowercase())
}

fn parse_uid(answer: Vec<u8>) -> Result<Vec<u8>, PcscTransportError> {
    let answer = APDUAnswer::from_answer(answer)
        .map_err(|_| PcscTransportError::Comm("UID response was too short"))?;
    if answer.status_word() != StatusWord::SUCCESS {
        return Err(PcscTransportError::Comm("reader rejected GET DATA (UID)"));
    }
    Ok(answer.data().to_vec())
}

#[async_trait]
impl NfcPlatform for TransportNativePcsc {
    type Error = PcscTransportError;

    async fn start(&self) -> Result<(), Self::Error> {
        let mut context = self.context.lock().expect("PC/SC context poisoned");
        if context.is_none() {
            *context = Some(Context::establish(Scope::User)?);
            info!("PC/SC context established");
        }
        Ok(())
    }

    async fn request_technology(
        &self,
        tech: NfcTech,
        options: &RequestOptions,
    ) -> Result<NfcTech, Self::Error> {
        if tech != NfcTech::IsoDep {
            return Err(PcscTransportError::Unsupported(tech));
        }
        if self.card.lock().expect("PC/SC card poisoned").is_some() {
            return Err(PcscTransportError::Busy);
        }

        let context = self.context()?;
        if let Some(message) = &options.alert_message {
            info!("{}", message);
        }

        let ticket = self.ticket();
        let reader = self.wait_for_card(&context, ticket)?;
        let card = context.connect(&reader, self.config.share_mode.into(), Protocols::ANY)?;

        let mut slot = self.card.lock().expect("PC/SC card poisoned");
        if self.is_superseded(ticket) {
            let _ = card.disconnect(Disposition::LeaveCard);
            return Err(PcscTransportError::Cancelled);
        }
        *slot = Some(card);
        info!("card engaged on {}", reader.to_string_lossy());
        Ok(NfcTech::IsoDep)
    }

    async fn card_identifier(&self) -> Result<Vec<u8>, Self::Error> {
        let answer = self.with_card(|card| Self::transmit(card, &GET_UID_COMMAND))?;
        parse_uid(answer)
    }

    async fn transceive(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        self.with_card(|card| Self::transmit(card, command))
    }

    async fn release_technology(&self) -> Result<(), Self::Error> {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let card = self.card.lock().expect("PC/SC card poisoned").take();
        let context = self.context.lock().expect("PC/SC context poisoned").clone();

        if let Some(context) = context {
            if let Err(e) = context.cancel() {
                debug!("SCardCancel: {}", e);
            }
        }
        if let Some(card) = card {
            card.disconnect(Disposition::LeaveCard)
                .map_err(|(_, e)| PcscTransportError::Pcsc(e))?;
            info!("card released");
        }
        Ok(())
    }
}

#[async_trait]
impl CommandApduExchange for TransportNativePcsc {
    async fn send_command_apdu(
        &self,
        request: CommandApduRequest,
    ) -> Result<CommandApduReply, Self::Error> {
        let answer = self.with_card(|card| Self::transmit(card, request.as_bytes()))?;
        Ok(CommandApduReply::from_answer(&answer))
    }
}
