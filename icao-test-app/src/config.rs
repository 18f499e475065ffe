// SPDX-License-Identifier: Apache-2.0

//! Test run configuration

use std::path::Path;

use nfc_transport::{NfcTech, TransportKind};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::instructions::text;

/// Settings of a test run. Missing JSON keys fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestConfig {
    /// Technology the session is restricted to
    pub technology: NfcTech,
    /// How commands reach the card
    pub transport: TransportKind,
    /// Hint passed to the host while it waits for a card
    pub alert_message: String,
    /// Response text shown before a run completes
    pub placeholder: String,
    /// Prompt shown while waiting for the document
    pub waiting_prompt: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            technology: NfcTech::IsoDep,
            transport: TransportKind::platform_default(),
            alert_message: text::TECHNOLOGY_REQUEST_ALERT.to_string(),
            placeholder: text::RESPONSE_PLACEHOLDER.to_string(),
            waiting_prompt: text::WAITING_PROMPT.to_string(),
        }
    }
}

impl TestConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_technology(mut self, technology: NfcTech) -> Self {
        self.technology = technology;
        self
    }

    pub fn with_alert_message(mut self, message: impl Into<String>) -> Self {
        self.alert_message = message.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TestConfig::default();
        assert_eq!(config.technology, NfcTech::IsoDep);
        assert_eq!(config.placeholder, "APDU Response");
        assert_eq!(config.alert_message, "Ready to send some APDU");
        assert_eq!(config.transport, TransportKind::platform_default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            TestConfig::from_json_str(r#"{ "transport": "command-apdu", "placeholder": "-" }"#)
                .unwrap();
        assert_eq!(config.transport, TransportKind::CommandApdu);
        assert_eq!(config.placeholder, "-");
        assert_eq!(config.technology, NfcTech::IsoDep);
        assert_eq!(config.waiting_prompt, text::WAITING_PROMPT);
    }

    #[test]
    fn test_technology_is_kebab_case() {
        let config = TestConfig::from_json_str(r#"{ "technology": "iso-dep" }"#).unwrap();
        assert_eq!(config.technology, NfcTech::IsoDep);
        assert!(TestConfig::from_json_str(r#"{ "technology": "IsoDep" }"#).is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = TestConfig::from_json_str("{ transport: ").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = TestConfig::from_json_file("/nonexistent/icao-test.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
