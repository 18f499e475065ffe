// SPDX-License-Identifier: Apache-2.0

//! Operator-facing state of a test run
//!
//! The projection is a pure fold: every change to [`ObservableState`] goes
//! through [`Projection::reduce`] with a [`ProjectionEvent`].

use nfc_transport::NfcTech;
use serde::{Deserialize, Serialize};

/// The five fields shown to the operator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservableState {
    /// Technology label, empty until a card is engaged
    pub technology: String,
    /// Rendered card identifier, empty until read
    pub card_identifier: String,
    /// Rendered answer, or the placeholder
    pub response: String,
    pub success: bool,
    /// A run is waiting for a card or for its answer
    pub waiting: bool,
}

/// Progress of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectionEvent {
    /// Back to the initial state
    Reset,
    /// A run began waiting for a card
    Started,
    TechnologyAcquired { technology: NfcTech },
    IdentifierRead { identifier: String },
    /// The card answered; `response` is already rendered
    ResponseReceived { response: String, success: bool },
    /// The run aborted with an operator message
    Failed { message: String },
}

/// Reducer holding the configured placeholder text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Projection {
    placeholder: String,
}

impl Projection {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// State before any run: empty labels, placeholder response, idle
    pub fn initial(&self) -> ObservableState {
        ObservableState {
            response: self.placeholder.clone(),
            ..ObservableState::default()
        }
    }

    pub fn reduce(&self, state: ObservableState, event: ProjectionEvent) -> ObservableState {
        match event {
            ProjectionEvent::Reset => self.initial(),
            ProjectionEvent::Started => ObservableState {
                waiting: true,
                ..state
            },
            ProjectionEvent::TechnologyAcquired { technology } => ObservableState {
                technology: technology.label().to_string(),
                ..state
            },
            ProjectionEvent::IdentifierRead { identifier } => ObservableState {
                card_identifier: identifier,
                ..state
            },
            ProjectionEvent::ResponseReceived { response, success } => ObservableState {
                response,
                success,
                waiting: false,
                ..state
            },
            ProjectionEvent::Failed { .. } => ObservableState {
                success: false,
                waiting: false,
                ..state
            },
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(crate::instructions::text::RESPONSE_PLACEHOLDER)
    }
}
