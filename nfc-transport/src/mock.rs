//! Scripted host platform for tests and dry runs
//!
//! A [`MockPlatform`] holds at most one [`MockCard`]. Technology requests made
//! while no card is presented stay pending until [`MockPlatform::present_card`]
//! or a release resolves them.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::channel::oneshot;
use thiserror::Error;

use crate::platform::{
    CommandApduExchange, CommandApduReply, CommandApduRequest, NfcPlatform, NfcTech,
    RequestOptions,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MockError {
    #[error("NFC stack not started")]
    NotStarted,
    #[error("NFC stack failed to start: {0}")]
    StartFailed(String),
    #[error("a technology request is already pending")]
    Busy,
    #[error("technology request cancelled")]
    Cancelled,
    #[error("technology {0} not supported by the card")]
    Unsupported(NfcTech),
    #[error("no card engaged")]
    NotConnected,
    #[error("tag connection lost")]
    TagLost,
    #[error("timeout waiting for the card")]
    Timeout,
    #[error("malformed frame")]
    MalformedFrame,
    #[error("release failed")]
    ReleaseFailed,
}

/// A card with a fixed identifier and a queue of scripted answers
#[derive(Debug, Clone)]
pub struct MockCard {
    pub identifier: Vec<u8>,
    pub technology: NfcTech,
    answers: VecDeque<Result<Vec<u8>, MockError>>,
}

impl MockCard {
    pub fn new(identifier: impl Into<Vec<u8>>) -> Self {
        Self {
            identifier: identifier.into(),
            technology: NfcTech::IsoDep,
            answers: VecDeque::new(),
        }
    }

    pub fn with_technology(mut self, technology: NfcTech) -> Self {
        self.technology = technology;
        self
    }

    /// Queue an answer for the next exchange
    pub fn respond(mut self, answer: impl Into<Vec<u8>>) -> Self {
        self.answers.push_back(Ok(answer.into()));
        self
    }

    /// Queue a link fault for the next exchange
    pub fn fail(mut self, error: MockError) -> Self {
        self.answers.push_back(Err(error));
        self
    }
}

#[derive(Default)]
struct MockState {
    started: bool,
    start_failure: Option<String>,
    release_failure: bool,
    uninterruptible: bool,
    card: Option<MockCard>,
    waiter: Option<oneshot::Sender<Result<NfcTech, MockError>>>,
    acquired: bool,
    requests: usize,
    releases: usize,
    sent: Vec<Vec<u8>>,
}

#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    /// Platform with no card in the field
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform with `card` already in the field
    pub fn with_card(card: MockCard) -> Self {
        let platform = Self::new();
        platform.lock().card = Some(card);
        platform
    }

    /// Make every `start` fail with `reason`
    pub fn failing_start(self, reason: impl Into<String>) -> Self {
        self.lock().start_failure = Some(reason.into());
        self
    }

    /// Make every `release_technology` report a fault
    pub fn failing_release(self) -> Self {
        self.lock().release_failure = true;
        self
    }

    /// Make `release_technology` leave a pending request waiting, like hosts
    /// whose discovery call cannot be interrupted
    pub fn uninterruptible_requests(self) -> Self {
        self.lock().uninterruptible = true;
        self
    }

    /// Bring a card into the field, resolving a pending request
    pub fn present_card(&self, card: MockCard) {
        let mut state = self.lock();
        let technology = card.technology;
        state.card = Some(card);
        if let Some(waiter) = state.waiter.take() {
            let _ = waiter.send(Ok(technology));
        }
    }

    /// Take the card out of the field
    pub fn remove_card(&self) {
        let mut state = self.lock();
        state.card = None;
        state.acquired = false;
    }

    pub fn is_pending(&self) -> bool {
        self.lock().waiter.is_some()
    }

    pub fn is_acquired(&self) -> bool {
        self.lock().acquired
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    pub fn release_count(&self) -> usize {
        self.lock().releases
    }

    /// Every command that reached the card, in order
    pub fn sent_commands(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock platform state poisoned")
    }

    fn next_answer(&self, command: &[u8]) -> Result<Vec<u8>, MockError> {
        let mut state = self.lock();
        if !state.acquired {
            return Err(MockError::NotConnected);
        }
        state.sent.push(command.to_vec());
        let card = state.card.as_mut().ok_or(MockError::TagLost)?;
        card.answers.pop_front().unwrap_or(Err(MockError::Timeout))
    }
}

#[async_trait]
impl NfcPlatform for MockPlatform {
    type Error = MockError;

    async fn start(&self) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if let Some(reason) = &state.start_failure {
            return Err(MockError::StartFailed(reason.clone()));
        }
        state.started = true;
        Ok(())
    }

    async fn request_technology(
        &self,
        tech: NfcTech,
        _options: &RequestOptions,
    ) -> Result<NfcTech, Self::Error> {
        let waiter = {
            let mut state = self.lock();
            if !state.started {
                return Err(MockError::NotStarted);
            }
            if state.waiter.is_some() || state.acquired {
                return Err(MockError::Busy);
            }
            state.requests += 1;

            match state.card.as_ref().map(|card| card.technology) {
                Some(present) if present == tech => {
                    state.acquired = true;
                    return Ok(tech);
                }
                Some(_) => return Err(MockError::Unsupported(tech)),
                None => {
                    let (tx, rx) = oneshot::channel();
                    state.waiter = Some(tx);
                    rx
                }
            }
        };

        let detected = waiter.await.unwrap_or(Err(MockError::Cancelled))?;
        if detected != tech {
            return Err(MockError::Unsupported(tech));
        }
        self.lock().acquired = true;
        Ok(detected)
    }

    async fn card_identifier(&self) -> Result<Vec<u8>, Self::Error> {
        let state = self.lock();
        match (&state.card, state.acquired) {
            (Some(card), true) => Ok(card.identifier.clone()),
            _ => Err(MockError::NotConnected),
        }
    }

    async fn transceive(&self, command: &[u8]) -> Result<Vec<u8>, Self::Error> {
        self.next_answer(command)
    }

    async fn release_technology(&self) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.releases += 1;
        state.acquired = false;
        if !state.uninterruptible {
            if let Some(waiter) = state.waiter.take() {
                let _ = waiter.send(Err(MockError::Cancelled));
            }
        }
        if state.release_failure {
            return Err(MockError::ReleaseFailed);
        }
        Ok(())
    }
}

#[async_trait]
impl CommandApduExchange for MockPlatform {
    async fn send_command_apdu(
        &self,
        request: CommandApduRequest,
    ) -> Result<CommandApduReply, Self::Error> {
        let answer = self.next_answer(request.as_bytes())?;
        Ok(CommandApduReply::from_answer(&answer))
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn request_requires_start() {
        let platform = MockPlatform::with_card(MockCard::new([0x01]));
        let err = block_on(platform.request_technology(NfcTech::IsoDep, &RequestOptions::default()))
            .unwrap_err();
        assert_eq!(err, MockError::NotStarted);
    }

    #[test]
    fn pending_request_resolves_on_present() {
        let platform = MockPlatform::new();
        block_on(async {
            platform.start().await.unwrap();
            let options = RequestOptions::default();
            let (detected, ()) = futures::join!(
                platform.request_technology(NfcTech::IsoDep, &options),
                async {
                    assert!(platform.is_pending());
                    platform.present_card(MockCard::new([0xAA, 0xBB]));
                }
            );
            assert_eq!(detected.unwrap(), NfcTech::IsoDep);
            assert_eq!(platform.card_identifier().await.unwrap(), vec![0xAA, 0xBB]);
        });
    }

    #[test]
    fn release_cancels_pending_request() {
        let platform = MockPlatform::new();
        block_on(async {
            platform.start().await.unwrap();
            let options = RequestOptions::default();
            let (detected, released) = futures::join!(
                platform.request_technology(NfcTech::IsoDep, &options),
                platform.release_technology()
            );
            assert_eq!(detected.unwrap_err(), MockError::Cancelled);
            assert!(released.is_ok());
        });
        assert_eq!(platform.release_count(), 1);
        assert!(!platform.is_acquired());
    }

    #[test]
    fn exhausted_script_times_out() {
        let platform = MockPlatform::with_card(MockCard::new([0x01]));
        block_on(async {
            platform.start().await.unwrap();
            platform
                .request_technology(NfcTech::IsoDep, &RequestOptions::default())
                .await
                .unwrap();
            assert_eq!(platform.transceive(&[0x00]).await.unwrap_err(), MockError::Timeout);
        });
    }
}
