//! Proptest generators for property-based testing.

use proptest::prelude::*;

use timelock_core::{
    Address, CreateMessage, EncryptedHandle, InputProof, Keypair, RecordId, Timestamp,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a random encrypted handle.
pub fn handle() -> impl Strategy<Value = EncryptedHandle> {
    any::<[u8; 32]>().prop_map(EncryptedHandle::from_bytes)
}

/// Generate a small record id.
pub fn record_id(max: u64) -> impl Strategy<Value = RecordId> {
    (0..=max).prop_map(RecordId::new)
}

/// Generate a reasonable ledger timestamp.
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    (0u64..=u64::MAX / 2).prop_map(Timestamp::from_secs)
}

/// Generate a message title. Empty titles are valid.
pub fn title() -> impl Strategy<Value = String> {
    "[ -~]{0,64}".prop_map(String::from)
}

/// Generate ciphertext bytes of specified max length.
pub fn content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for a create request, relative to the time it is sent.
#[derive(Debug, Clone)]
pub struct CreateParams {
    pub title: String,
    pub content: Vec<u8>,
    pub handle: EncryptedHandle,
    /// Seconds after "now". Zero produces an invalid request.
    pub unlock_offset: u64,
}

impl CreateParams {
    /// Build the request as if sent at `now`.
    pub fn to_request(&self, now: Timestamp) -> CreateMessage {
        CreateMessage::new(
            self.title.clone(),
            self.content.clone(),
            self.handle,
            InputProof::empty(),
            now.saturating_add(self.unlock_offset),
        )
    }
}

impl Arbitrary for CreateParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            title(),
            content(256),
            handle(),
            0u64..=100_000u64, // unlock offset
        )
            .prop_map(|(title, content, handle, unlock_offset)| CreateParams {
                title,
                content,
                handle,
                unlock_offset,
            })
            .boxed()
    }
}

/// One step of a generated registry session.
///
/// Parties are indices into a caller-provided list of addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOp {
    Create { creator: usize, unlock_offset: u64 },
    Allow { caller: usize, id: u64, recipient: usize },
    Advance(u64),
}

/// Generate one registry step among `parties` parties.
pub fn registry_op(parties: usize) -> impl Strategy<Value = RegistryOp> {
    let parties = parties.max(1);
    prop_oneof![
        3 => (0..parties, 0u64..=50u64)
            .prop_map(|(creator, unlock_offset)| RegistryOp::Create { creator, unlock_offset }),
        3 => (0..parties, 0u64..12u64, 0..parties)
            .prop_map(|(caller, id, recipient)| RegistryOp::Allow { caller, id, recipient }),
        2 => (0u64..=40u64).prop_map(RegistryOp::Advance),
    ]
}

/// Generate a registry session of up to `max_len` steps.
pub fn registry_ops(parties: usize, max_len: usize) -> impl Strategy<Value = Vec<RegistryOp>> {
    prop::collection::vec(registry_op(parties), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelock_core::Record;

    proptest! {
        #[test]
        fn test_request_valid_iff_unlock_in_future(params: CreateParams, now in timestamp()) {
            let request = params.to_request(now);
            let record = Record::new(RecordId::FIRST, Address::ZERO, request, now);

            prop_assert_eq!(record.is_ok(), params.unlock_offset > 0);
        }

        #[test]
        fn test_fresh_record_is_ungranted(params: CreateParams, creator in address()) {
            prop_assume!(params.unlock_offset > 0);
            let now = Timestamp::from_secs(1_000);

            let record = Record::new(RecordId::FIRST, creator, params.to_request(now), now).unwrap();

            prop_assert!(!record.access_granted());
            prop_assert_eq!(record.granted_recipient(), None);
            prop_assert_eq!(record.creator(), creator);
        }

        #[test]
        fn test_ops_reference_known_parties(ops in registry_ops(3, 20)) {
            for op in ops {
                match op {
                    RegistryOp::Create { creator, .. } => prop_assert!(creator < 3),
                    RegistryOp::Allow { caller, recipient, .. } => {
                        prop_assert!(caller < 3);
                        prop_assert!(recipient < 3);
                    }
                    RegistryOp::Advance(_) => {}
                }
            }
        }
    }
}
