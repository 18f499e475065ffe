// SPDX-License-Identifier: Apache-2.0

//! SELECT eMRTD application command implementation

use async_trait::async_trait;
use log::debug;
use nfc_apdu::APDUCommand;
use nfc_session::{Session, SessionManager};
use nfc_transport::CommandApduExchange;

use crate::errors::IcaoAppResult;
use crate::instructions::{aid, ins, p1_select, p2_select, test_case_7816_a_1};
use crate::IcaoApp;

/// Build the 7816_A_1 command: SELECT by DF name, no response data, no Le
pub fn select_lds_command() -> APDUCommand<Vec<u8>> {
    APDUCommand {
        cla: IcaoApp::CLA,
        ins: ins::SELECT,
        p1: p1_select::BY_DF_NAME,
        p2: p2_select::NO_RESPONSE_DATA,
        data: aid::ICAO_LDS.to_vec(),
        le: None,
    }
}

#[async_trait]
pub trait SelectApplication<P>
where
    P: CommandApduExchange,
{
    /// Select the eMRTD application on the card engaged by `session`
    ///
    /// Returns the raw answer with its trailing status word. Judging the
    /// answer is left to the caller.
    async fn select_application(
        manager: &SessionManager<P>,
        session: &Session,
    ) -> IcaoAppResult<Vec<u8>, P::Error>;
}

#[async_trait]
impl<P> SelectApplication<P> for IcaoApp
where
    P: CommandApduExchange,
{
    async fn select_application(
        manager: &SessionManager<P>,
        session: &Session,
    ) -> IcaoAppResult<Vec<u8>, P::Error> {
        let command = select_lds_command().serialize()?;
        debug_assert_eq!(command, test_case_7816_a_1::COMMAND);
        debug!(
            "{}: sending SELECT {}",
            test_case_7816_a_1::NAME,
            hex::encode(&command)
        );

        let response = manager.send(session, &command).await?;
        Ok(response)
    }
}
