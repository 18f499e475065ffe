// SPDX-License-Identifier: Apache-2.0

//! APDU constants for ICAO 9303 test case 7816_A_1

/// Interindustry class, no secure messaging, no chaining
pub const CLA_ISO: u8 = 0x00;

/// APDU instruction codes
pub mod ins {
    /// SELECT
    pub const SELECT: u8 = 0xA4;
}

/// P1 parameter constants for SELECT
pub mod p1_select {
    /// Select by DF name (application identifier)
    pub const BY_DF_NAME: u8 = 0x04;
}

/// P2 parameter constants for SELECT
pub mod p2_select {
    /// Return no file information
    pub const NO_RESPONSE_DATA: u8 = 0x0C;
}

/// Application identifiers
pub mod aid {
    /// eMRTD Logical Data Structure application
    pub const ICAO_LDS: [u8; 7] = [0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01];
}

/// Test case 7816_A_1: select the eMRTD application
///
/// P2 asks for no file information and no Le is sent, so the response data
/// field must be empty and the document must answer with status `90 00`.
pub mod test_case_7816_a_1 {
    use nfc_apdu::StatusWord;

    /// Test case name as listed by ICAO
    pub const NAME: &str = "7816_A_1";

    /// The full command, as sent on the wire
    pub const COMMAND: [u8; 12] = [
        0x00, 0xA4, 0x04, 0x0C, 0x07, 0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01,
    ];

    /// Only acceptable answer
    pub const EXPECTED_STATUS: StatusWord = StatusWord::SUCCESS;

    /// Only acceptable rendered answer
    pub const EXPECTED_RESPONSE: &str = "9000";
}

/// Operator-facing defaults
pub mod text {
    /// Response shown before any run completes
    pub const RESPONSE_PLACEHOLDER: &str = "APDU Response";
    /// Hint passed to the host while it waits for a card
    pub const TECHNOLOGY_REQUEST_ALERT: &str = "Ready to send some APDU";
    /// Prompt shown while waiting for the document
    pub const WAITING_PROMPT: &str = "Please move the CIE near the mobile phone!";
}
