//! The registry: create time-locked messages and grant decryption access.
//!
//! The registry brings together storage, the clock, the encryption-service
//! boundary and event delivery behind four operations.

use std::sync::Arc;

use serde::Deserialize;
use timelock_access::{AccessControl, HandleAcl, ProofVerifier, TrustedVerifier, VerificationContext};
use timelock_core::{
    validate_unlock, Address, Clock, CreateMessage, MessageView, Record, RecordId, RegistryEvent,
    SystemClock, Timestamp, ValidationError,
};
use timelock_store::{GrantResult, InsertResult, Store, StoreError, StoreExt};

use crate::error::{RegistryError, Result};
use crate::events::{EventSink, NoopSink};

/// Configuration for the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// The registry's own address. Proofs are bound to it and it is allowed
    /// on every recipient handle.
    pub address: Address,
    /// Whether to check input proofs on create.
    pub verify_proofs: bool,
    /// Command queue size of a [`RegistryService`](crate::RegistryService).
    pub mailbox_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: Address::ZERO,
            verify_proofs: true,
            mailbox_capacity: 64,
        }
    }
}

/// The message registry.
///
/// Mutations take `&mut self`, so calls on one instance are serialized.
/// Every operation reads the clock once.
pub struct MessageRegistry<S: Store> {
    /// The storage backend.
    store: S,
    /// Configuration.
    config: RegistryConfig,
    verifier: Arc<dyn ProofVerifier>,
    access: Arc<dyn AccessControl>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl<S: Store> MessageRegistry<S> {
    /// Create a registry with default collaborators: trusted proofs, an
    /// in-memory ACL, no event delivery and the system clock.
    pub fn new(store: S, config: RegistryConfig) -> Self {
        RegistryBuilder::new(store).config(config).build()
    }

    /// Start building a registry over `store`.
    pub fn builder(store: S) -> RegistryBuilder<S> {
        RegistryBuilder::new(store)
    }

    /// The registry's own address.
    pub fn address(&self) -> Address {
        self.config.address
    }

    /// Get the configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The access-control layer handles are registered with.
    pub fn access_control(&self) -> &Arc<dyn AccessControl> {
        &self.access
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a record owned by `caller`.
    ///
    /// Checks the unlock time, then the input proof. On success the record
    /// is stored ungranted, the registry and `caller` are allowed on the
    /// recipient handle, and `MessageCreated` is emitted.
    pub fn create(&mut self, caller: Address, request: CreateMessage) -> Result<RecordId> {
        let now = self.clock.now();

        if let Err(err) = validate_unlock(request.unlock_timestamp, now) {
            return Err(self.reject("create", caller, None, err.into()));
        }

        if self.config.verify_proofs {
            let context = VerificationContext::new(self.config.address, caller);
            if !self
                .verifier
                .verify(&request.encrypted_recipient, &request.input_proof, &context)
            {
                return Err(self.reject("create", caller, None, RegistryError::InvalidProof));
            }
        }

        let id = self.store.next_record_id()?;
        let record = Record::new(id, caller, request, now)?;

        match self.store.insert_record(&record)? {
            InsertResult::Inserted => {}
            InsertResult::AlreadyExists => {
                let expected = self.store.next_record_id()?;
                return Err(StoreError::IdConflict { id, expected }.into());
            }
            InsertResult::OutOfOrder { expected } => {
                return Err(StoreError::IdConflict { id, expected }.into());
            }
        }

        self.access.allow(&record.encrypted_recipient(), self.config.address);
        self.access.allow(&record.encrypted_recipient(), caller);

        tracing::info!(
            record_id = %id,
            creator = %caller,
            unlock = %record.unlock_timestamp(),
            "message created"
        );

        self.emit(RegistryEvent::MessageCreated {
            id,
            creator: caller,
            unlock_timestamp: record.unlock_timestamp(),
            created_at: now,
        });

        Ok(id)
    }

    /// Grant `recipient` decryption access to record `id`.
    ///
    /// Checked in order: the record exists, `caller` created it, the unlock
    /// time has been reached, and no grant exists yet.
    pub fn allow(&mut self, caller: Address, id: RecordId, recipient: Address) -> Result<()> {
        let now = self.clock.now();

        let record = match self.store.get_record(id)? {
            Some(record) => record,
            None => return Err(self.reject("allow", caller, Some(id), RegistryError::NotFound(id))),
        };

        if record.creator() != caller {
            let err = RegistryError::Unauthorized { id, caller };
            return Err(self.reject("allow", caller, Some(id), err));
        }

        if !record.unlock_reached(now) {
            let err = RegistryError::TooEarly {
                id,
                unlock: record.unlock_timestamp(),
                now,
            };
            return Err(self.reject("allow", caller, Some(id), err));
        }

        if record.access_granted() {
            return Err(self.reject("allow", caller, Some(id), RegistryError::AlreadyGranted(id)));
        }

        match self.store.record_grant(id, recipient)? {
            GrantResult::Granted => {}
            GrantResult::AlreadyGranted { .. } => {
                return Err(self.reject("allow", caller, Some(id), RegistryError::AlreadyGranted(id)));
            }
            GrantResult::NotFound => {
                return Err(self.reject("allow", caller, Some(id), RegistryError::NotFound(id)));
            }
        }

        self.access.allow(&record.encrypted_recipient(), recipient);

        tracing::info!(record_id = %id, recipient = %recipient, "decryption allowed");

        self.emit(RegistryEvent::DecryptionAllowed { id, recipient });

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot of record `id`, with `unlock_reached` computed now.
    pub fn get_message(&self, id: RecordId) -> Result<MessageView> {
        let now = self.clock.now();
        tracing::debug!(record_id = %id, "get message");

        self.store
            .get_record(id)?
            .map(|record| record.view(now))
            .ok_or(RegistryError::NotFound(id))
    }

    /// Ids created by `creator`, in creation order. Empty if none.
    pub fn get_message_ids_by_creator(&self, creator: &Address) -> Result<Vec<RecordId>> {
        tracing::debug!(creator = %creator, "get message ids by creator");
        Ok(self.store.record_ids_by_creator(creator)?)
    }

    /// Snapshots of every record created by `creator`, in creation order.
    pub fn messages_by_creator(&self, creator: &Address) -> Result<Vec<MessageView>> {
        let now = self.clock.now();
        tracing::debug!(creator = %creator, "messages by creator");

        Ok(self
            .store
            .records_by_creator(creator)?
            .iter()
            .map(|record| record.view(now))
            .collect())
    }

    /// Number of records created so far. Also the next id.
    pub fn message_count(&self) -> Result<u64> {
        Ok(self.store.record_count()?)
    }

    /// Current time as the registry sees it.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn emit(&self, event: RegistryEvent) {
        tracing::debug!(event = event.name(), record_id = %event.record_id(), "emitting event");
        self.events.emit(event);
    }

    fn reject(
        &self,
        operation: &'static str,
        caller: Address,
        id: Option<RecordId>,
        err: RegistryError,
    ) -> RegistryError {
        match id {
            Some(id) => tracing::warn!(operation, caller = %caller, record_id = %id, error = %err, "rejected"),
            None => tracing::warn!(operation, caller = %caller, error = %err, "rejected"),
        }
        err
    }
}

impl From<ValidationError> for RegistryError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnlockNotInFuture { unlock, now } => {
                RegistryError::InvalidUnlockTime { unlock, now }
            }
            ValidationError::GrantMismatch { id } => RegistryError::Store(StoreError::InvalidData(
                format!("record {id}: grant flag and recipient disagree"),
            )),
        }
    }
}

/// Builder for [`MessageRegistry`].
pub struct RegistryBuilder<S: Store> {
    store: S,
    config: RegistryConfig,
    verifier: Option<Arc<dyn ProofVerifier>>,
    access: Option<Arc<dyn AccessControl>>,
    events: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<S: Store> RegistryBuilder<S> {
    /// Start a builder over `store` with the default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: RegistryConfig::default(),
            verifier: None,
            access: None,
            events: None,
            clock: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the registry address.
    pub fn address(mut self, address: Address) -> Self {
        self.config.address = address;
        self
    }

    /// Set the proof verifier.
    pub fn verifier(mut self, verifier: impl ProofVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Set the access-control layer.
    pub fn access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = Some(access);
        self
    }

    /// Set the event sink.
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the registry.
    pub fn build(self) -> MessageRegistry<S> {
        MessageRegistry {
            store: self.store,
            config: self.config,
            verifier: self.verifier.unwrap_or_else(|| Arc::new(TrustedVerifier)),
            access: self.access.unwrap_or_else(|| Arc::new(HandleAcl::new())),
            events: self.events.unwrap_or_else(|| Arc::new(NoopSink)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}
