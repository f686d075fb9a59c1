// SPDX-License-Identifier: MIT OR Apache-2.0

//! HashiCorp Vault configuration reader.
//!
//! This module wires the pieces needed to fill record fields from Vault:
//!
//! - [`VaultClient`]: blocking HTTP client for the few endpoints used
//! - [`auth`]: token, Kubernetes and AWS IAM authentication with background
//!   token renewal
//! - [`VaultStorage`]: authenticated reads and writes of secrets
//! - [`VaultReader`]: the [`Reader`](crate::ports::Reader) for `vault = "path:key"`
//!   annotations
//!
//! # Examples
//!
//! ```rust,no_run
//! use cfgbind::adapters::vault::{
//!     KubernetesAuth, VaultClient, VaultConfig, VaultReader, VaultStorage,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), cfgbind::domain::AuthError> {
//! let client = VaultClient::new(&VaultConfig::new("https://vault:8200"))?;
//! let auth = Arc::new(KubernetesAuth::new(client.clone(), "billing"));
//! let storage = Arc::new(VaultStorage::new(client, auth).with_data_key("data"));
//! let reader = VaultReader::new(storage);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod reader;
pub mod storage;

pub use auth::{AwsIamAuth, KubernetesAuth, TokenAuth};
pub use client::{TokenInfo, VaultClient, VaultConfig};
pub use reader::VaultReader;
pub use storage::{Secret, VaultStorage};
