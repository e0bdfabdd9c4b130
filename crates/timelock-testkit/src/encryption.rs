//! A stand-in for the encryption service.
//!
//! Recipients are sealed with ChaCha20-Poly1305 under a service-held key.
//! The handle is the Blake3 hash of the sealed bytes. The input proof is a
//! keyed Blake3 MAC over the handle, the target registry and the caller, so
//! a proof produced for one registry or caller fails for another.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use timelock_access::{AccessControl, ProofVerifier, VerificationContext};
use timelock_core::{Address, EncryptedHandle, InputProof};

const HANDLE_DOMAIN: &[u8] = b"timelock-mock-handle-v0:";
const PROOF_KEY_CONTEXT: &str = "timelock-mock-v0 input proof";
const SEAL_KEY_CONTEXT: &str = "timelock-mock-v0 recipient seal";

/// Errors returned by the mock encryption service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MockCryptoError {
    /// The requester is not on the handle's access list.
    #[error("{requester} is not allowed to decrypt this handle")]
    NotAllowed { requester: Address },

    /// The service never produced this handle.
    #[error("unknown handle")]
    UnknownHandle,

    /// The AEAD refused to seal or open.
    #[error("cipher error: {0}")]
    Cipher(String),
}

/// What a client receives after encrypting a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handle: EncryptedHandle,
    pub proof: InputProof,
}

/// In-process mock of the encryption service.
pub struct MockEncryptionService {
    seal_key: [u8; 32],
    proof_key: [u8; 32],
    /// handle -> nonce || ciphertext
    sealed: Mutex<HashMap<EncryptedHandle, Vec<u8>>>,
}

impl MockEncryptionService {
    /// Create a service with a random master key.
    pub fn new() -> Self {
        let mut master = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut master);
        Self::from_master_key(master)
    }

    /// Create a service with a fixed master key.
    pub fn from_master_key(master: [u8; 32]) -> Self {
        Self {
            seal_key: blake3::derive_key(SEAL_KEY_CONTEXT, &master),
            proof_key: blake3::derive_key(PROOF_KEY_CONTEXT, &master),
            sealed: Mutex::new(HashMap::new()),
        }
    }

    /// Encrypt `recipient` for submission to `registry` by `caller`.
    pub fn encrypt_recipient(
        &self,
        registry: Address,
        caller: Address,
        recipient: Address,
    ) -> Result<EncryptedInput, MockCryptoError> {
        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.seal_key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), recipient.as_bytes().as_slice())
            .map_err(|e| MockCryptoError::Cipher(e.to_string()))?;

        let mut sealed = Vec::with_capacity(nonce.len() + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        let mut hasher = blake3::Hasher::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update(&sealed);
        let handle = EncryptedHandle::from_bytes(*hasher.finalize().as_bytes());

        let proof = self.prove(&handle, registry, caller);

        self.sealed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, sealed);

        Ok(EncryptedInput { handle, proof })
    }

    /// Decrypt `handle` on behalf of `requester`, if `acl` allows it.
    pub fn user_decrypt(
        &self,
        handle: &EncryptedHandle,
        requester: Address,
        acl: &dyn AccessControl,
    ) -> Result<Address, MockCryptoError> {
        if !acl.is_allowed(handle, &requester) {
            return Err(MockCryptoError::NotAllowed { requester });
        }

        let sealed = self
            .sealed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
            .ok_or(MockCryptoError::UnknownHandle)?;

        if sealed.len() < 12 {
            return Err(MockCryptoError::Cipher("sealed value too short".into()));
        }
        let (nonce, ciphertext) = sealed.split_at(12);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.seal_key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| MockCryptoError::Cipher(e.to_string()))?;

        Address::try_from(plaintext.as_slice()).map_err(|e| MockCryptoError::Cipher(e.to_string()))
    }

    /// A verifier that accepts this service's proofs.
    pub fn verifier(&self) -> MockVerifier {
        MockVerifier {
            proof_key: self.proof_key,
        }
    }

    fn prove(&self, handle: &EncryptedHandle, registry: Address, caller: Address) -> InputProof {
        InputProof::new(proof_mac(&self.proof_key, handle, registry, caller).to_vec())
    }
}

impl Default for MockEncryptionService {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks proofs issued by a [`MockEncryptionService`].
#[derive(Clone)]
pub struct MockVerifier {
    proof_key: [u8; 32],
}

impl ProofVerifier for MockVerifier {
    fn verify(
        &self,
        handle: &EncryptedHandle,
        proof: &InputProof,
        context: &VerificationContext,
    ) -> bool {
        let expected = proof_mac(&self.proof_key, handle, context.registry, context.caller);
        // blake3::Hash equality is constant-time.
        <[u8; 32]>::try_from(proof.as_bytes())
            .map(|tag| blake3::Hash::from(tag) == blake3::Hash::from(expected))
            .unwrap_or(false)
    }
}

fn proof_mac(
    key: &[u8; 32],
    handle: &EncryptedHandle,
    registry: Address,
    caller: Address,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_keyed(key);
    hasher.update(handle.as_bytes());
    hasher.update(registry.as_bytes());
    hasher.update(caller.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelock_access::HandleAcl;

    const REGISTRY: Address = Address([0xAA; 20]);
    const CREATOR: Address = Address([1; 20]);
    const RECIPIENT: Address = Address([2; 20]);

    #[test]
    fn test_proof_bound_to_registry_and_caller() {
        let service = MockEncryptionService::from_master_key([7; 32]);
        let verifier = service.verifier();
        let input = service.encrypt_recipient(REGISTRY, CREATOR, RECIPIENT).unwrap();

        let ok = VerificationContext::new(REGISTRY, CREATOR);
        assert!(verifier.verify(&input.handle, &input.proof, &ok));

        let other_registry = VerificationContext::new(Address::ZERO, CREATOR);
        assert!(!verifier.verify(&input.handle, &input.proof, &other_registry));

        let other_caller = VerificationContext::new(REGISTRY, RECIPIENT);
        assert!(!verifier.verify(&input.handle, &input.proof, &other_caller));

        assert!(!verifier.verify(&input.handle, &InputProof::empty(), &ok));
    }

    #[test]
    fn test_other_service_rejects_proof() {
        let a = MockEncryptionService::from_master_key([1; 32]);
        let b = MockEncryptionService::from_master_key([2; 32]);
        let input = a.encrypt_recipient(REGISTRY, CREATOR, RECIPIENT).unwrap();

        let ctx = VerificationContext::new(REGISTRY, CREATOR);
        assert!(!b.verifier().verify(&input.handle, &input.proof, &ctx));
    }

    #[test]
    fn test_user_decrypt_requires_acl() {
        let service = MockEncryptionService::new();
        let acl = HandleAcl::new();
        let input = service.encrypt_recipient(REGISTRY, CREATOR, RECIPIENT).unwrap();

        assert_eq!(
            service.user_decrypt(&input.handle, CREATOR, &acl),
            Err(MockCryptoError::NotAllowed { requester: CREATOR })
        );

        acl.allow(&input.handle, CREATOR);
        assert_eq!(service.user_decrypt(&input.handle, CREATOR, &acl), Ok(RECIPIENT));
    }

    #[test]
    fn test_same_recipient_gets_fresh_handles() {
        let service = MockEncryptionService::new();
        let a = service.encrypt_recipient(REGISTRY, CREATOR, RECIPIENT).unwrap();
        let b = service.encrypt_recipient(REGISTRY, CREATOR, RECIPIENT).unwrap();
        assert_ne!(a.handle, b.handle);
    }

    #[test]
    fn test_unknown_handle() {
        let service = MockEncryptionService::new();
        let acl = HandleAcl::new();
        let handle = EncryptedHandle::from_bytes([0; 32]);
        acl.allow(&handle, CREATOR);

        assert_eq!(
            service.user_decrypt(&handle, CREATOR, &acl),
            Err(MockCryptoError::UnknownHandle)
        );
    }
}
