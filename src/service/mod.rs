// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer containing the configuration service.
//!
//! This module contains the materialization pipeline, which runs readers,
//! defaults and validation over a record, and the service that repeats it on a
//! fixed interval.

pub mod default_service;
mod refresh;

// Re-export commonly used types
pub use default_service::{
    read_and_validate, ConfigService, ConfigServiceBuilder, Outcome, RefreshCallback,
};
