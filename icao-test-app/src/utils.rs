// SPDX-License-Identifier: Apache-2.0

//! Rendering helpers

use crate::instructions::test_case_7816_a_1::EXPECTED_RESPONSE;

/// Canonical rendering of a card answer: lowercase hex, no separators
pub fn render_response(response: &[u8]) -> String {
    hex::encode(response)
}

/// Card identifiers are rendered like responses
pub fn render_identifier(identifier: &[u8]) -> String {
    hex::encode(identifier)
}

/// The whole rendered answer must be exactly `9000`; data bytes fail the test
pub fn is_expected_response(rendered: &str) -> bool {
    rendered == EXPECTED_RESPONSE
}
