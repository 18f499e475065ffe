//! Exclusive contactless technology sessions
//!
//! [`SessionManager`] owns the single technology session a process may hold
//! at a time. Sessions move through `Idle -> Acquiring -> Acquired -> Released`
//! and are released at most once towards the host, whatever path ends them.
//! Release never fails: host faults raised while releasing are logged and
//! dropped.

mod errors;
mod state;

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use nfc_transport::{
    ApduTransport, CommandApduExchange, Exchange, NfcTech, RequestOptions,
    TransportError, TransportKind,
};

pub use errors::*;
pub use state::{PlatformStatus, SessionId, SessionState};

/// Handle returned by a successful [`SessionManager::open`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    technology: NfcTech,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Technology reported by the host for the engaged card
    pub fn technology(&self) -> NfcTech {
        self.technology
    }
}

struct Slot {
    id: SessionId,
    technology: NfcTech,
    state: SessionState,
    identifier: Option<Vec<u8>>,
}

impl Slot {
    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "session {} cannot go from {} to {}",
            self.id,
            self.state,
            next
        );
        debug!("session {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }
}

struct Inner {
    status: PlatformStatus,
    last_id: u64,
    current: Option<Slot>,
}

enum Settled {
    Acquired(Session),
    Failed,
    Superseded,
}

/// Owner of the process-wide contactless session
pub struct SessionManager<P> {
    platform: Arc<P>,
    transport: ApduTransport<P>,
    inner: Mutex<Inner>,
}

impl<P> SessionManager<P>
where
    P: CommandApduExchange,
{
    /// Manager exchanging APDUs through the `transport` strategy
    pub fn new(platform: Arc<P>, transport: TransportKind) -> Self {
        SessionManager {
            transport: ApduTransport::new(transport, platform.clone()),
            platform,
            inner: Mutex::new(Inner {
                status: PlatformStatus::NotStarted,
                last_id: 0,
                current: None,
            }),
        }
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn platform_status(&self) -> PlatformStatus {
        self.lock().status.clone()
    }

    /// Start the host stack once. Later calls return the first outcome.
    pub async fn start(&self) -> SessionResult<(), P::Error> {
        match self.platform_status() {
            PlatformStatus::Started => return Ok(()),
            PlatformStatus::Failed(reason) => return Err(InitializationError { reason }.into()),
            PlatformStatus::NotStarted => {}
        }

        match self.platform.start().await {
            Ok(()) => {
                self.lock().status = PlatformStatus::Started;
                info!("NFC stack started");
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                self.lock().status = PlatformStatus::Failed(reason.clone());
                warn!("NFC stack failed to start: {}", reason);
                self.release_platform().await;
                Err(InitializationError { reason }.into())
            }
        }
    }

    /// Acquire a card supporting `technology`, waiting until one is presented
    pub async fn open(
        &self,
        technology: NfcTech,
        options: &RequestOptions,
    ) -> SessionResult<Session, P::Error> {
        let id = {
            let mut inner = self.lock();
            if inner.status != PlatformStatus::Started {
                return Err(AcquisitionError::NotInitialized.into());
            }
            if inner.current.as_ref().is_some_and(|s| s.state.is_active()) {
                return Err(AcquisitionError::Busy.into());
            }

            inner.last_id += 1;
            let id = SessionId(inner.last_id);
            let mut slot = Slot {
                id,
                technology,
                state: SessionState::Idle,
                identifier: None,
            };
            slot.advance(SessionState::Acquiring);
            inner.current = Some(slot);
            id
        };

        info!("session {}: waiting for a {} card", id, technology);
        let requested = self.platform.request_technology(technology, options).await;

        let settled = {
            let mut inner = self.lock();
            let slot = inner
                .current
                .as_mut()
                .filter(|s| s.id == id && s.state == SessionState::Acquiring);
            match (slot, &requested) {
                (Some(slot), Ok(detected)) => {
                    slot.technology = *detected;
                    slot.advance(SessionState::Acquired);
                    Settled::Acquired(Session {
                        id,
                        technology: *detected,
                    })
                }
                (Some(slot), Err(_)) => {
                    slot.advance(SessionState::Released);
                    Settled::Failed
                }
                (None, _) => Settled::Superseded,
            }
        };

        match (settled, requested) {
            (Settled::Acquired(session), _) => {
                info!("session {}: {} card engaged", id, session.technology);
                Ok(session)
            }
            (Settled::Failed, Err(e)) => {
                info!("session {}: acquisition failed: {}", id, e);
                self.release_platform().await;
                Err(AcquisitionError::Platform(e).into())
            }
            (Settled::Superseded, Ok(_)) => {
                info!("session {}: card arrived after release, handing it back", id);
                self.release_platform().await;
                Err(AcquisitionError::Cancelled.into())
            }
            (_, _) => Err(AcquisitionError::Cancelled.into()),
        }
    }

    /// Identifier of the card engaged by `session`
    pub async fn identifier_of(&self, session: &Session) -> SessionResult<Vec<u8>, P::Error> {
        {
            let inner = self.lock();
            let slot = Self::acquired_slot(&inner, session)?;
            if let Some(identifier) = &slot.identifier {
                return Ok(identifier.clone());
            }
        }

        let identifier = self
            .platform
            .card_identifier()
            .await
            .map_err(TransportError::Link)?;

        let mut inner = self.lock();
        if let Some(slot) = inner.current.as_mut().filter(|s| s.id == session.id) {
            slot.identifier = Some(identifier.clone());
        }
        Ok(identifier)
    }

    /// Send `command` to the card engaged by `session`
    pub async fn send(&self, session: &Session, command: &[u8]) -> SessionResult<Vec<u8>, P::Error> {
        {
            let inner = self.lock();
            Self::acquired_slot(&inner, session)?;
        }
        Ok(self.transport.exchange(command).await?)
    }

    /// Release `session`. Idempotent and infallible.
    pub async fn release(&self, session: &Session) {
        let released = {
            let mut inner = self.lock();
            match inner
                .current
                .as_mut()
                .filter(|s| s.id == session.id && s.state.is_active())
            {
                Some(slot) => {
                    slot.advance(SessionState::Released);
                    true
                }
                None => false,
            }
        };

        if released {
            self.release_platform().await;
            info!("session {}: released", session.id);
        }
    }

    /// Release whichever session is acquiring or acquired, if any
    pub async fn release_current(&self) {
        let released = {
            let mut inner = self.lock();
            match inner.current.as_mut().filter(|s| s.state.is_active()) {
                Some(slot) => {
                    slot.advance(SessionState::Released);
                    Some(slot.id)
                }
                None => None,
            }
        };

        if let Some(id) = released {
            self.release_platform().await;
            info!("session {}: released", id);
        }
    }

    /// State of `session`; sessions replaced by a newer one are `Released`
    pub fn state_of(&self, session: &Session) -> SessionState {
        let inner = self.lock();
        match inner.current.as_ref() {
            Some(slot) if slot.id == session.id => slot.state,
            _ => SessionState::Released,
        }
    }

    /// State of the most recent session, `Idle` before the first `open`
    pub fn current_state(&self) -> SessionState {
        self.lock()
            .current
            .as_ref()
            .map_or(SessionState::Idle, |s| s.state)
    }

    fn acquired_slot<'a>(
        inner: &'a MutexGuard<'_, Inner>,
        session: &Session,
    ) -> Result<&'a Slot, SessionStateError> {
        let actual = match inner.current.as_ref() {
            Some(slot) if slot.id == session.id => {
                if slot.state == SessionState::Acquired {
                    return Ok(slot);
                }
                slot.state
            }
            _ => SessionState::Released,
        };
        Err(SessionStateError {
            session: session.id,
            expected: SessionState::Acquired,
            actual,
        })
    }

    async fn release_platform(&self) {
        if let Err(e) = self.platform.release_technology().await {
            warn!("ignoring fault while releasing technology: {}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("session state poisoned")
    }
}
