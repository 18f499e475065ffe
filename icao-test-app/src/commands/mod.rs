// SPDX-License-Identifier: Apache-2.0

//! Command implementations for the ICAO test application

pub mod select_application;

pub use select_application::*;
