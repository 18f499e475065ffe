// SPDX-License-Identifier: Apache-2.0

//! Operator commands driving test runs
//!
//! [`TestController`] owns the [`ObservableState`] snapshot. Every run and
//! every cancellation opens a new generation; events reported by a run of an
//! older generation are dropped, so a cancelled run never writes into the
//! state that replaced it.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};
use nfc_session::{AcquisitionError, SessionError, SessionManager};
use nfc_transport::CommandApduExchange;

use crate::config::TestConfig;
use crate::errors::IcaoAppResult;
use crate::projection::{ObservableState, Projection, ProjectionEvent};
use crate::runner::TestRunner;
use crate::types::TestOutcome;

type Listener = Box<dyn Fn(&ObservableState) + Send + Sync>;

struct Shared {
    state: ObservableState,
    generation: u64,
}

pub struct TestController<P> {
    runner: TestRunner<P>,
    projection: Projection,
    shared: Mutex<Shared>,
    listener: Option<Listener>,
}

impl<P> TestController<P>
where
    P: CommandApduExchange,
{
    pub fn new(manager: Arc<SessionManager<P>>, config: TestConfig) -> Self {
        let projection = Projection::new(config.placeholder.clone());
        TestController {
            shared: Mutex::new(Shared {
                state: projection.initial(),
                generation: 0,
            }),
            runner: TestRunner::new(manager, config),
            projection,
            listener: None,
        }
    }

    /// Controller over a fresh session manager using the configured transport
    pub fn for_platform(platform: Arc<P>, config: TestConfig) -> Self {
        let manager = Arc::new(SessionManager::new(platform, config.transport));
        Self::new(manager, config)
    }

    /// Call `listener` with every new snapshot
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&ObservableState) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn manager(&self) -> &Arc<SessionManager<P>> {
        self.runner.manager()
    }

    pub fn config(&self) -> &TestConfig {
        self.runner.config()
    }

    pub fn snapshot(&self) -> ObservableState {
        self.lock().state.clone()
    }

    /// Start the host stack. A failure is returned for display; the stack
    /// is left released.
    pub async fn start_platform(&self) -> IcaoAppResult<(), P::Error> {
        self.manager().start().await?;
        Ok(())
    }

    /// Reset the state and run the test once
    ///
    /// Rejected with a busy acquisition error while another run is waiting;
    /// the state is then left untouched.
    pub async fn start_test(&self) -> IcaoAppResult<TestOutcome, P::Error> {
        let (generation, snapshot) = {
            let mut shared = self.lock();
            if shared.state.waiting {
                return Err(SessionError::<P::Error>::from(AcquisitionError::Busy).into());
            }
            shared.generation += 1;
            // claimed here so a concurrent start sees the run before it is polled
            shared.state = self
                .projection
                .reduce(self.projection.initial(), ProjectionEvent::Started);
            (shared.generation, shared.state.clone())
        };
        info!("run {}: started", generation);
        self.notify(&snapshot);

        self.runner.run(|event| self.apply(generation, event)).await
    }

    /// Abort the current run: release the session directly and reset
    pub async fn cancel(&self) {
        let generation = {
            let mut shared = self.lock();
            shared.generation += 1;
            shared.generation
        };
        info!("run {}: cancelled", generation - 1);

        self.manager().release_current().await;

        let snapshot = {
            let mut shared = self.lock();
            shared.state = self
                .projection
                .reduce(shared.state.clone(), ProjectionEvent::Reset);
            shared.state.clone()
        };
        self.notify(&snapshot);
    }

    /// Release a session left open by the host, unless a run is waiting
    pub async fn teardown(&self) {
        if self.snapshot().waiting {
            debug!("teardown while waiting, session left to the run");
            return;
        }
        self.manager().release_current().await;
    }

    fn apply(&self, generation: u64, event: ProjectionEvent) {
        let snapshot = {
            let mut shared = self.lock();
            if shared.generation != generation {
                debug!("run {}: dropping {:?}", generation, event);
                return;
            }
            let next = self.projection.reduce(shared.state.clone(), event);
            if next == shared.state {
                return;
            }
            shared.state = next;
            shared.state.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &ObservableState) {
        if let Some(listener) = &self.listener {
            listener(snapshot);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect("controller state poisoned")
    }
}

#[cfg(test)]
mod tests {
    use nfc_session::SessionState;
    use nfc_transport::mock::{MockCard, MockError, MockPlatform};
    use nfc_transport::{NfcTech, RequestOptions, TransportKind};

    use super::*;

    async fn controller(platform: MockPlatform) -> TestController<MockPlatform> {
        let config = TestConfig::default().with_transport(TransportKind::Transceive);
        let controller = TestController::for_platform(Arc::new(platform), config);
        controller.start_platform().await.unwrap();
        controller
    }

    fn platform(controller: &TestController<MockPlatform>) -> &MockPlatform {
        controller.manager().platform()
    }

    #[tokio::test]
    async fn test_scenario_passing_document() {
        let card = MockCard::new([0xDE, 0xAD, 0xBE, 0xEF]).respond([0x90, 0x00]);
        let controller = controller(MockPlatform::with_card(card)).await;

        controller.start_test().await.unwrap();

        assert_eq!(
            controller.snapshot(),
            ObservableState {
                technology: "ISO-DEP".to_string(),
                card_identifier: "deadbeef".to_string(),
                response: "9000".to_string(),
                success: true,
                waiting: false,
            }
        );
        assert_eq!(controller.manager().current_state(), SessionState::Released);
    }

    #[tokio::test]
    async fn test_scenario_transport_fault() {
        let card = MockCard::new([0xDE, 0xAD, 0xBE, 0xEF]).fail(MockError::TagLost);
        let controller = controller(MockPlatform::with_card(card)).await;

        let err = controller.start_test().await.unwrap_err();

        assert!(err.is_transport_error());
        let state = controller.snapshot();
        assert_eq!(state.response, "APDU Response");
        assert!(!state.success);
        assert!(!state.waiting);
        assert_eq!(controller.manager().current_state(), SessionState::Released);
        assert_eq!(platform(&controller).release_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_acquisition_fault() {
        let card = MockCard::new([0xDE, 0xAD]).with_technology(NfcTech::NfcV);
        let controller = controller(MockPlatform::with_card(card)).await;

        let err = controller.start_test().await.unwrap_err();

        assert!(err.is_acquisition_error());
        let state = controller.snapshot();
        assert_eq!(state.card_identifier, "");
        assert_eq!(state.response, "APDU Response");
        assert!(!state.success);
        assert!(!state.waiting);
    }

    #[tokio::test]
    async fn test_scenario_file_not_found() {
        let card = MockCard::new([0x01]).respond([0x6A, 0x82]);
        let controller = controller(MockPlatform::with_card(card)).await;

        controller.start_test().await.unwrap();

        let state = controller.snapshot();
        assert_eq!(state.response, "6a82");
        assert!(!state.success);
    }

    #[tokio::test]
    async fn test_both_transports_agree() {
        for transport in [TransportKind::Transceive, TransportKind::CommandApdu] {
            let card = MockCard::new([0xDE, 0xAD, 0xBE, 0xEF]).respond([0x90, 0x00]);
            let config = TestConfig::default().with_transport(transport);
            let controller =
                TestController::for_platform(Arc::new(MockPlatform::with_card(card)), config);
            controller.start_platform().await.unwrap();

            let outcome = controller.start_test().await.unwrap();
            assert_eq!(outcome.response, [0x90, 0x00]);
            assert_eq!(controller.manager().transport_kind(), transport);
        }
    }

    #[tokio::test]
    async fn test_long_and_empty_answers() {
        let long: Vec<u8> = (0..=255u8).chain([0x90, 0x00]).collect();
        let card = MockCard::new([0x01])
            .respond(long.clone())
            .respond(Vec::new());
        let controller = controller(MockPlatform::with_card(card)).await;

        controller.start_test().await.unwrap();
        let state = controller.snapshot();
        assert_eq!(state.response, hex::encode(&long));
        assert!(!state.success);

        controller.start_test().await.unwrap();
        let state = controller.snapshot();
        assert_eq!(state.response, "");
        assert!(!state.success);
    }

    #[tokio::test]
    async fn test_short_answers_complete_on_both_transports() {
        for transport in [TransportKind::Transceive, TransportKind::CommandApdu] {
            let card = MockCard::new([0x01]).respond(Vec::new()).respond([0x90]);
            let config = TestConfig::default().with_transport(transport);
            let controller =
                TestController::for_platform(Arc::new(MockPlatform::with_card(card)), config);
            controller.start_platform().await.unwrap();

            let outcome = controller.start_test().await.unwrap();
            assert_eq!(outcome.rendered_response, "");
            assert_eq!(outcome.status_word, None);
            let state = controller.snapshot();
            assert_eq!(state.response, "");
            assert!(!state.success);
            assert!(!state.waiting);

            let outcome = controller.start_test().await.unwrap();
            assert_eq!(outcome.response, [0x90]);
            assert_eq!(controller.snapshot().response, "90");
            assert!(!controller.snapshot().success);
        }
    }

    #[tokio::test]
    async fn test_listener_sees_each_change_once() {
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let sink = snapshots.clone();
        let card = MockCard::new([0xDE, 0xAD, 0xBE, 0xEF]).respond([0x90, 0x00]);
        let controller = controller(MockPlatform::with_card(card))
            .await
            .with_listener(move |state| sink.lock().unwrap().push(state.clone()));

        controller.start_test().await.unwrap();

        let snapshots = snapshots.lock().unwrap();
        // waiting, technology, identifier, response
        assert_eq!(snapshots.len(), 4);
        assert!(snapshots[0].waiting);
        assert_eq!(snapshots[0].response, "APDU Response");
        assert!(snapshots.windows(2).all(|pair| pair[0] != pair[1]));
        assert_eq!(snapshots[3], controller.snapshot());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let controller = controller(MockPlatform::new()).await;

        let (result, ()) = tokio::join!(controller.start_test(), async {
            assert!(platform(&controller).is_pending());
            assert!(controller.snapshot().waiting);
            controller.cancel().await;
        });

        assert!(result.unwrap_err().is_cancelled());
        assert!(!controller.snapshot().waiting);
        assert_eq!(controller.snapshot(), Projection::default().initial());
        assert!(!platform(&controller).is_acquired());
        assert_ne!(controller.manager().current_state(), SessionState::Acquired);
    }

    #[tokio::test]
    async fn test_cancelled_run_events_are_dropped() {
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let sink = snapshots.clone();
        let controller = controller(MockPlatform::new())
            .await
            .with_listener(move |state| sink.lock().unwrap().push(state.clone()));

        let (result, ()) = tokio::join!(controller.start_test(), controller.cancel());
        assert!(result.is_err());

        let snapshots = snapshots.lock().unwrap();
        // waiting, then reset; the run's failure report is not applied
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].waiting);
        assert_eq!(snapshots[1], Projection::default().initial());
    }

    #[tokio::test]
    async fn test_late_card_after_cancel() {
        let controller = controller(MockPlatform::new().uninterruptible_requests()).await;

        let (result, ()) = tokio::join!(controller.start_test(), async {
            controller.cancel().await;
            platform(&controller).present_card(MockCard::new([0x01]).respond([0x90, 0x00]));
        });

        assert!(result.unwrap_err().is_cancelled());
        assert!(platform(&controller).sent_commands().is_empty());
        assert!(!platform(&controller).is_acquired());
        assert_eq!(platform(&controller).release_count(), 2);
        assert_eq!(controller.snapshot(), Projection::default().initial());
    }

    #[tokio::test]
    async fn test_start_while_waiting_is_busy() {
        let controller = controller(MockPlatform::new()).await;

        let (first, ()) = tokio::join!(controller.start_test(), async {
            let err = controller.start_test().await.unwrap_err();
            assert!(err.is_acquisition_error());
            assert!(controller.snapshot().waiting);
            assert_eq!(platform(&controller).request_count(), 1);
            controller.cancel().await;
        });

        assert!(first.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_restart_after_run() {
        let card = MockCard::new([0x01])
            .respond([0x6A, 0x82])
            .respond([0x90, 0x00]);
        let controller = controller(MockPlatform::with_card(card)).await;

        controller.start_test().await.unwrap();
        assert!(!controller.snapshot().success);
        controller.start_test().await.unwrap();
        assert!(controller.snapshot().success);
        assert_eq!(platform(&controller).release_count(), 2);
    }

    #[tokio::test]
    async fn test_teardown() {
        let controller = controller(MockPlatform::with_card(MockCard::new([0x01]))).await;

        controller.teardown().await;
        assert_eq!(platform(&controller).release_count(), 0);

        let session = controller
            .manager()
            .open(NfcTech::IsoDep, &RequestOptions::default())
            .await
            .unwrap();
        controller.teardown().await;
        assert_eq!(controller.manager().state_of(&session), SessionState::Released);
        assert_eq!(platform(&controller).release_count(), 1);

        controller.teardown().await;
        assert_eq!(platform(&controller).release_count(), 1);
    }

    #[tokio::test]
    async fn test_teardown_leaves_waiting_run() {
        let controller = controller(MockPlatform::new()).await;

        let (result, ()) = tokio::join!(controller.start_test(), async {
            controller.teardown().await;
            assert!(platform(&controller).is_pending());
            controller.cancel().await;
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_platform_start_failure() {
        let platform = MockPlatform::with_card(MockCard::new([0x01])).failing_start("no NFC adapter");
        let controller = TestController::for_platform(Arc::new(platform), TestConfig::default());

        let err = controller.start_platform().await.unwrap_err();
        assert!(err.is_initialization_error());
        assert!(err.user_message().contains("no NFC adapter"));

        let err = controller.start_test().await.unwrap_err();
        assert!(err.before_exchange());
        assert!(!controller.snapshot().waiting);
    }
}
