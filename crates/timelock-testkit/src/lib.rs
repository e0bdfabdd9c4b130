//! # Timelock Testkit
//!
//! Testing utilities for the timelock registry.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a registry wired to a manual clock, an in-memory ACL, an
//!   event log and three deterministic parties
//! - **Mock encryption**: a stand-in encryption service whose proofs the
//!   registry can verify and whose decrypt call honours the ACL
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use timelock_testkit::fixtures::{TestFixture, ONE_HOUR};
//!
//! let mut fx = TestFixture::new();
//! let id = fx.create("Hello", ONE_HOUR).unwrap();
//! fx.advance(ONE_HOUR);
//! let (creator, recipient) = (fx.creator_address(), fx.recipient_address());
//! fx.registry.allow(creator, id, recipient).unwrap();
//! assert_eq!(fx.decrypt_recipient(id, recipient), Ok(recipient));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use timelock_testkit::generators::CreateParams;
//!
//! proptest! {
//!     #[test]
//!     fn create_respects_unlock(params: CreateParams) {
//!         // ...
//!     }
//! }
//! ```

pub mod encryption;
pub mod fixtures;
pub mod generators;

pub use encryption::{EncryptedInput, MockCryptoError, MockEncryptionService, MockVerifier};
pub use fixtures::{named_signers, signer, TestFixture, ONE_HOUR, REGISTRY_ADDRESS, START_TIME};
pub use generators::{CreateParams, RegistryOp};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Filtered by `RUST_LOG` when set. Safe to call from every test; only the
/// first call installs anything.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
