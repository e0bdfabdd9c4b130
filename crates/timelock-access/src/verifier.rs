//! Input proof verification.
//!
//! The encryption service hands callers an encrypted handle together with a
//! proof that the handle was produced for a specific registry and caller. The
//! registry does not know how to check that proof; it asks a `ProofVerifier`.

use timelock_core::{Address, EncryptedHandle, InputProof};

/// What a proof must be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationContext {
    /// The registry the handle is being submitted to.
    pub registry: Address,

    /// The account submitting it.
    pub caller: Address,
}

impl VerificationContext {
    /// Create a new context.
    pub fn new(registry: Address, caller: Address) -> Self {
        Self { registry, caller }
    }
}

/// Checks that an encrypted handle and its proof belong together.
pub trait ProofVerifier: Send + Sync {
    /// Return `true` if `proof` shows `handle` was produced for `context`.
    fn verify(
        &self,
        handle: &EncryptedHandle,
        proof: &InputProof,
        context: &VerificationContext,
    ) -> bool;
}

/// Accepts every handle.
///
/// Use when the encryption service has already validated inputs upstream,
/// so the registry treats `(handle, proof)` as trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedVerifier;

impl ProofVerifier for TrustedVerifier {
    fn verify(
        &self,
        _handle: &EncryptedHandle,
        _proof: &InputProof,
        _context: &VerificationContext,
    ) -> bool {
        true
    }
}

impl<F> ProofVerifier for F
where
    F: Fn(&EncryptedHandle, &InputProof, &VerificationContext) -> bool + Send + Sync,
{
    fn verify(
        &self,
        handle: &EncryptedHandle,
        proof: &InputProof,
        context: &VerificationContext,
    ) -> bool {
        self(handle, proof, context)
    }
}
