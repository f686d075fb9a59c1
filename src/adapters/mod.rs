// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing configuration reader implementations.
//!
//! This module contains concrete implementations of the traits defined in the
//! ports layer: the environment variable reader and the Vault reader together
//! with its authentication methods.

#[cfg(feature = "env")]
pub mod env_var;
#[cfg(feature = "vault")]
pub mod vault;

// Re-export adapters based on feature flags
#[cfg(feature = "env")]
pub use env_var::EnvReader;
#[cfg(feature = "vault")]
pub use vault::{AwsIamAuth, KubernetesAuth, TokenAuth, VaultReader, VaultStorage};
