// SPDX-License-Identifier: Apache-2.0

//! Core data types for the ICAO test application

use nfc_apdu::StatusWord;
use nfc_transport::NfcTech;

/// Result of one completed exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    /// Technology reported by the host
    pub technology: NfcTech,
    /// Identifier of the engaged card
    pub card_identifier: Vec<u8>,
    /// Raw answer, status word included
    pub response: Vec<u8>,
    /// Lowercase hex rendering of `response`
    pub rendered_response: String,
    /// Trailing status word, when the answer holds one
    pub status_word: Option<StatusWord>,
    /// `rendered_response == "9000"`
    pub success: bool,
}
