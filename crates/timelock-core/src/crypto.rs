//! Opaque cryptographic values and signer identities.
//!
//! The registry never interprets encrypted handles or proofs. They are
//! stored and returned byte-for-byte. Signer keypairs exist so callers (and
//! tests) can derive stable account addresses from Ed25519 keys.

use bytes::Bytes;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Address;

/// Domain separator for address derivation.
const ADDRESS_DOMAIN: &[u8] = b"timelock-address-v0:";

/// A 32-byte encrypted identity handle.
///
/// Produced by the encryption service from a plaintext recipient address.
/// This is ciphertext from the registry's point of view.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedHandle(pub [u8; 32]);

impl EncryptedHandle {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for EncryptedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedHandle({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for EncryptedHandle {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for EncryptedHandle {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for EncryptedHandle {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Proof that an encrypted handle was produced for a given registry and caller.
///
/// Arbitrary length; only a `ProofVerifier` knows how to read it.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputProof(pub Bytes);

impl InputProof {
    /// Wrap raw proof bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// An empty proof.
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the proof is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for InputProof {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Derive the account address controlled by this key.
    ///
    /// The address is the last 20 bytes of a domain-separated Blake3 hash.
    pub fn address(&self) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ADDRESS_DOMAIN);
        hasher.update(&self.0);
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest.as_bytes()[12..]);
        Address(out)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

/// A signing identity.
///
/// Wraps ed25519-dalek's `SigningKey`; its account address is what the
/// registry sees as `creator` or caller.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Get the account address for this keypair.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_deterministic_from_seed() {
        let kp1 = Keypair::from_seed(&[0x42; 32]);
        let kp2 = Keypair::from_seed(&[0x42; 32]);
        assert_eq!(kp1.address(), kp2.address());

        let other = Keypair::from_seed(&[0x43; 32]);
        assert_ne!(kp1.address(), other.address());
    }

    #[test]
    fn test_generated_keypairs_differ() {
        let a = Keypair::generate();
        let b = Keypair::generate();
        assert_ne!(a.address(), b.address());
        assert_eq!(a.address(), a.public_key().address());
    }

    #[test]
    fn test_handle_debug_is_truncated() {
        let handle = EncryptedHandle::from_bytes([0xab; 32]);
        assert_eq!(format!("{:?}", handle), "EncryptedHandle(abababababababab)");
    }

    #[test]
    fn test_proof_is_opaque_bytes() {
        let proof = InputProof::from(vec![1, 2, 3]);
        assert_eq!(proof.len(), 3);
        assert_eq!(proof.as_bytes(), &[1, 2, 3]);
        assert!(InputProof::empty().is_empty());
    }
}
