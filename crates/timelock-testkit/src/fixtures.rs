//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: three named parties, a manual
//! clock, a mock encryption service and a registry wired to all of them.

use std::sync::Arc;

use timelock_access::{AccessControl, HandleAcl};
use timelock_core::{Address, Clock, CreateMessage, Keypair, ManualClock, RecordId, Timestamp};
use timelock_registry::{EventLog, MessageRegistry, RegistryConfig, Result};
use timelock_store::{MemoryStore, Store};

use crate::encryption::{MockCryptoError, MockEncryptionService};

/// Address the fixture registry runs at.
pub const REGISTRY_ADDRESS: Address = Address([0x5e; 20]);

/// Ledger time the fixture clock starts at.
pub const START_TIME: Timestamp = Timestamp(1_700_000_000);

/// One hour, the unlock delay used by most scenarios.
pub const ONE_HOUR: u64 = 3_600;

/// A registry plus everything around it.
pub struct TestFixture<S: Store = MemoryStore> {
    /// Creates messages.
    pub creator: Keypair,
    /// Receives access.
    pub recipient: Keypair,
    /// Anyone else.
    pub stranger: Keypair,
    pub clock: ManualClock,
    pub acl: Arc<HandleAcl>,
    pub events: Arc<EventLog>,
    pub encryption: MockEncryptionService,
    pub registry: MessageRegistry<S>,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    /// Create a fixture over `store`, with proof checking against the mock
    /// encryption service.
    pub fn with_store(store: S) -> Self {
        let clock = ManualClock::new(START_TIME);
        let acl = Arc::new(HandleAcl::new());
        let events = Arc::new(EventLog::new());
        let encryption = MockEncryptionService::from_master_key([0x42; 32]);

        let registry = MessageRegistry::builder(store)
            .config(RegistryConfig {
                address: REGISTRY_ADDRESS,
                ..RegistryConfig::default()
            })
            .verifier(encryption.verifier())
            .access_control(acl.clone())
            .events(events.clone())
            .clock(Arc::new(clock.clone()))
            .build();

        Self {
            creator: signer(0),
            recipient: signer(1),
            stranger: signer(2),
            clock,
            acl,
            events,
            encryption,
            registry,
        }
    }

    /// The creator's address.
    pub fn creator_address(&self) -> Address {
        self.creator.address()
    }

    /// The recipient's address.
    pub fn recipient_address(&self) -> Address {
        self.recipient.address()
    }

    /// The stranger's address.
    pub fn stranger_address(&self) -> Address {
        self.stranger.address()
    }

    /// Build a create request from the creator for the recipient, unlocking
    /// `unlock_in` seconds from now.
    pub fn request(&self, title: &str, unlock_in: u64) -> CreateMessage {
        self.request_from(&self.creator, title, unlock_in)
    }

    /// Build a create request from `sender` for the recipient.
    pub fn request_from(&self, sender: &Keypair, title: &str, unlock_in: u64) -> CreateMessage {
        let input = self
            .encryption
            .encrypt_recipient(REGISTRY_ADDRESS, sender.address(), self.recipient_address())
            .expect("mock encryption");

        let body = format!("ciphertext of {title}");
        CreateMessage::new(
            title,
            body.into_bytes(),
            input.handle,
            input.proof,
            self.clock.now().saturating_add(unlock_in),
        )
    }

    /// Create a message from the creator to the recipient.
    pub fn create(&mut self, title: &str, unlock_in: u64) -> Result<RecordId> {
        let request = self.request(title, unlock_in);
        let creator = self.creator_address();
        self.registry.create(creator, request)
    }

    /// Move ledger time forward.
    pub fn advance(&self, secs: u64) -> Timestamp {
        self.clock.advance(secs)
    }

    /// Ask the mock encryption service to decrypt the recipient handle of
    /// record `id` for `requester`.
    pub fn decrypt_recipient(
        &self,
        id: RecordId,
        requester: Address,
    ) -> std::result::Result<Address, MockCryptoError> {
        let view = self
            .registry
            .get_message(id)
            .map_err(|_| MockCryptoError::UnknownHandle)?;
        let acl: &dyn AccessControl = self.acl.as_ref();
        self.encryption
            .user_decrypt(&view.encrypted_recipient, requester, acl)
    }
}

/// Deterministic keypair number `index`.
pub fn signer(index: u64) -> Keypair {
    let mut seed = [0u8; 32];
    seed[..8].copy_from_slice(&index.to_le_bytes());
    seed[31] = 0x7e;
    Keypair::from_seed(&seed)
}

/// Deterministic keypairs for multi-party tests.
pub fn named_signers(count: usize) -> Vec<Keypair> {
    (0..count as u64).map(signer).collect()
}
