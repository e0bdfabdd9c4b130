//! # Timelock Access
//!
//! The registry's side of the encryption-service boundary.
//!
//! ## Overview
//!
//! The registry never encrypts or decrypts anything. It relies on two
//! capabilities of the encryption service, modelled here as traits so they
//! can be swapped for fakes in tests:
//!
//! - [`ProofVerifier`]: decides whether an encrypted recipient handle and its
//!   input proof were produced for this registry and caller.
//! - [`AccessControl`]: the per-handle access list the encryption service
//!   consults before decrypting for an account.
//!
//! ## Access Model
//!
//! 1. On create, the registry and the creator are allowed on the handle.
//! 2. On a successful grant, the recipient is allowed on the handle.
//! 3. Nothing is ever revoked.

pub mod state;
pub mod verifier;

pub use state::{AccessControl, HandleAcl};
pub use verifier::{ProofVerifier, TrustedVerifier, VerificationContext};
