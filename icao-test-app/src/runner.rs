// SPDX-License-Identifier: Apache-2.0

//! Single-shot execution of test case 7816_A_1

use std::sync::Arc;

use log::{info, warn};
use nfc_apdu::APDUAnswer;
use nfc_session::{Session, SessionManager};
use nfc_transport::{CommandApduExchange, RequestOptions};

use crate::commands::SelectApplication;
use crate::config::TestConfig;
use crate::errors::IcaoAppResult;
use crate::instructions::test_case_7816_a_1;
use crate::projection::ProjectionEvent;
use crate::types::TestOutcome;
use crate::utils::{is_expected_response, render_identifier, render_response};
use crate::IcaoApp;

/// Runs the test against whatever card the session manager engages
pub struct TestRunner<P> {
    manager: Arc<SessionManager<P>>,
    config: TestConfig,
}

impl<P> TestRunner<P>
where
    P: CommandApduExchange,
{
    pub fn new(manager: Arc<SessionManager<P>>, config: TestConfig) -> Self {
        Self { manager, config }
    }

    pub fn manager(&self) -> &Arc<SessionManager<P>> {
        &self.manager
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Run the test once, reporting progress through `emit`
    ///
    /// The session opened here is released before the final event is
    /// emitted, whatever the outcome. Every failure is reported as
    /// [`ProjectionEvent::Failed`] and returned.
    pub async fn run<F>(&self, mut emit: F) -> IcaoAppResult<TestOutcome, P::Error>
    where
        F: FnMut(ProjectionEvent) + Send,
    {
        emit(ProjectionEvent::Started);

        let options = RequestOptions::default().with_alert_message(&self.config.alert_message);
        let result = match self.manager.open(self.config.technology, &options).await {
            Ok(session) => {
                let result = self.exchange(&session, &mut emit).await;
                self.manager.release(&session).await;
                result
            }
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(outcome) => {
                emit(ProjectionEvent::ResponseReceived {
                    response: outcome.rendered_response.clone(),
                    success: outcome.success,
                });
                Ok(outcome)
            }
            Err(e) => {
                let message = e.user_message();
                warn!("{}: {}", test_case_7816_a_1::NAME, message);
                emit(ProjectionEvent::Failed { message });
                Err(e)
            }
        }
    }

    async fn exchange<F>(
        &self,
        session: &Session,
        emit: &mut F,
    ) -> IcaoAppResult<TestOutcome, P::Error>
    where
        F: FnMut(ProjectionEvent) + Send,
    {
        emit(ProjectionEvent::TechnologyAcquired {
            technology: session.technology(),
        });

        let card_identifier = self.manager.identifier_of(session).await?;
        emit(ProjectionEvent::IdentifierRead {
            identifier: render_identifier(&card_identifier),
        });

        let response = IcaoApp::select_application(self.manager.as_ref(), session).await?;
        let rendered_response = render_response(&response);
        let success = is_expected_response(&rendered_response);
        let status_word = APDUAnswer::from_answer(response.as_slice())
            .ok()
            .map(|answer| answer.status_word());

        match status_word {
            Some(sw) => info!(
                "{}: card {} answered {} [{}], expected {} ({})",
                test_case_7816_a_1::NAME,
                render_identifier(&card_identifier),
                rendered_response,
                sw.description(),
                test_case_7816_a_1::EXPECTED_STATUS,
                if success { "passed" } else { "failed" }
            ),
            None => info!(
                "{}: card {} answered {:?} without a status word (failed)",
                test_case_7816_a_1::NAME,
                render_identifier(&card_identifier),
                rendered_response
            ),
        }

        Ok(TestOutcome {
            technology: session.technology(),
            card_identifier,
            response,
            rendered_response,
            status_word,
            success,
        })
    }
}
