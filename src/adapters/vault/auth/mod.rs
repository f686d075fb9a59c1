// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault authentication methods.
//!
//! Every method implements [`Authenticator`](crate::ports::Authenticator) on top
//! of a shared [`TokenSession`], which holds the credential and renews it in the
//! background at a tenth of its time-to-live. A renewal failure ends the loop;
//! the next `authenticate` call after the token expires logs in again.

pub mod aws_iam;
pub mod kubernetes;
pub mod session;
pub mod token;

pub use aws_iam::AwsIamAuth;
pub use kubernetes::KubernetesAuth;
pub use session::{renewal_delay, Credential, TokenSession};
pub use token::TokenAuth;
