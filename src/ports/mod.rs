// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) that define the interfaces
//! for the components of the configuration system. Readers and authenticators
//! are implemented by adapters in the adapters layer; validators and cloud
//! request signers are supplied by the caller.

pub mod authenticator;
pub mod reader;
pub mod validator;

// Re-export commonly used types
pub use authenticator::{Authenticator, IamRequestSigner, SignedRequest};
pub use reader::{Reader, SecretPathFormatter};
pub use validator::Validator;
