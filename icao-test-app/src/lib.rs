// SPDX-License-Identifier: Apache-2.0

//! ICAO 9303 contactless test application
//!
//! This crate runs test case 7816_A_1 against an electronic identity document:
//! it waits for an ISO-DEP card, selects the eMRTD application and checks that
//! the document answers exactly `90 00`.
//!
//! ## Features
//!
//! - **Test Runner**: one-shot open, identify, select, release sequence
//! - **Projection**: operator-facing state as a pure fold over run events
//! - **Controller**: start, cancel and teardown with stale-run protection
//! - **Configuration**: JSON-loadable settings with sensible defaults
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use icao_test_app::{TestConfig, TestController};
//! # async fn demo<P: nfc_transport::CommandApduExchange>(platform: Arc<P>) {
//! let controller = TestController::for_platform(platform, TestConfig::default());
//! if let Err(e) = controller.start_platform().await {
//!     eprintln!("{}", e.user_message());
//!     return;
//! }
//! let _ = controller.start_test().await;
//! println!("{:?}", controller.snapshot());
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod instructions;
pub mod projection;
pub mod runner;
pub mod types;
pub mod utils;

pub use commands::*;
pub use config::TestConfig;
pub use controller::TestController;
pub use errors::*;
pub use projection::{ObservableState, Projection, ProjectionEvent};
pub use runner::TestRunner;
pub use types::*;

/// ICAO test application marker, implementing its commands
#[derive(Debug, Clone)]
pub struct IcaoApp;

impl IcaoApp {
    /// Interindustry class used by every command of the test
    pub const CLA: u8 = instructions::CLA_ISO;
}
