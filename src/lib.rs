// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed configuration records materialized from loosely typed sources.
//!
//! This crate fills a plain Rust struct from environment variables and HashiCorp
//! Vault, converting every raw string to the field's type, and keeps the struct
//! up to date by re-reading its sources on a fixed interval. Vault tokens are
//! renewed in the background for as long as the process runs.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: Core types and logic (`Record`, `FieldDescriptor`, the
//!   `Coerce` engine, errors)
//! - **Ports**: Trait definitions that define interfaces (`Reader`,
//!   `Authenticator`, `Validator`)
//! - **Adapters**: Implementations for specific sources (environment, Vault)
//! - **Service**: The pipeline and refresh loop that orchestrate everything
//!
//! # Features
//!
//! - **Declarative Fields**: `#[derive(Record)]` with per-field source annotations
//! - **Type Safety**: Integers, floats, booleans, durations, timestamps,
//!   sequences, maps, optional and nested records, plus custom `Coerce` types
//! - **Precedence**: Readers run in order; the last one to supply a value wins
//! - **Defaults**: Applied only to fields no reader supplied
//! - **Dynamic Reloading**: Periodic refresh with an outcome callback
//! - **Vault**: Token, Kubernetes and AWS IAM authentication with token renewal
//!
//! # Feature Flags
//!
//! - `env`: Enable the environment variable reader (default)
//! - `vault`: Enable the Vault reader and authentication methods (default)
//! - `derive`: Enable `#[derive(Record)]` (default)
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust
//! use cfgbind::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::{Arc, RwLock};
//! use std::time::Duration;
//!
//! #[derive(Debug, Default, Record)]
//! struct Server {
//!     #[config(env = "SERVER_HOST", default = "0.0.0.0")]
//!     host: String,
//!     #[config(env = "SERVER_PORT", default = "8080")]
//!     port: u16,
//!     #[config(env = "SERVER_TIMEOUT", default = "30s")]
//!     timeout: Duration,
//! }
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let mut env = HashMap::new();
//! env.insert("SERVER_PORT".to_string(), "9000".to_string());
//!
//! let server = Arc::new(RwLock::new(Server::default()));
//! let service = ConfigService::new();
//! let readers: Vec<Box<dyn Reader>> = vec![Box::new(EnvReader::with_values(env))];
//!
//! service.start(Arc::clone(&server), None, readers).into_result()?;
//!
//! let server = server.read().unwrap();
//! assert_eq!(server.host, "0.0.0.0");
//! assert_eq!(server.port, 9000);
//! assert_eq!(server.timeout, Duration::from_secs(30));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

// Lets the derive macro refer to `::cfgbind` from inside this crate.
extern crate self as cfgbind;

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(feature = "derive")]
pub use cfgbind_derive::Record;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        BoxError, Coerce, CoerceOptions, ConfigError, FieldDescriptor, Provider, Record, Result,
    };
    pub use crate::ports::{Authenticator, Reader, Validator};
    pub use crate::service::{ConfigService, ConfigServiceBuilder, Outcome, RefreshCallback};

    #[cfg(feature = "derive")]
    pub use cfgbind_derive::Record;

    // Re-export adapters based on feature flags
    #[cfg(feature = "env")]
    pub use crate::adapters::EnvReader;
    #[cfg(feature = "vault")]
    pub use crate::adapters::{KubernetesAuth, TokenAuth, VaultReader, VaultStorage};
}
