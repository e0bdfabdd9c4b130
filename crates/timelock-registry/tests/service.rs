//! The registry behind its async service, observed through a broadcast sink.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use timelock_registry::core::ManualClock;
use timelock_registry::store::SqliteStore;
use timelock_registry::{
    BroadcastSink, ErrorKind, MessageRegistry, RegistryConfig, RegistryEvent, RegistryService,
};
use timelock_testkit::{init_tracing, MockEncryptionService, TestFixture, ONE_HOUR, START_TIME};
use tokio::time::timeout;

fn spawn_service(
    clock: &ManualClock,
    encryption: &MockEncryptionService,
    sink: &BroadcastSink,
) -> Result<RegistryService<SqliteStore>> {
    let registry = MessageRegistry::builder(SqliteStore::open_memory()?)
        .config(RegistryConfig {
            address: timelock_testkit::REGISTRY_ADDRESS,
            mailbox_capacity: 8,
            ..RegistryConfig::default()
        })
        .verifier(encryption.verifier())
        .events(Arc::new(sink.clone()))
        .clock(Arc::new(clock.clone()))
        .build();
    Ok(RegistryService::spawn(registry))
}

#[tokio::test]
async fn service_lifecycle_with_live_events() -> Result<()> {
    init_tracing();
    // Only used for its parties and request builder.
    let fx = TestFixture::new();
    let (creator, recipient, stranger) = (
        fx.creator_address(),
        fx.recipient_address(),
        fx.stranger_address(),
    );

    let sink = BroadcastSink::new();
    let mut events = sink.subscribe();
    let service = spawn_service(&fx.clock, &fx.encryption, &sink)?;
    let handle = service.handle();

    let id = handle.create(creator, fx.request("Hello", ONE_HOUR)).await?;

    let event = timeout(Duration::from_secs(1), events.recv()).await??;
    assert_eq!(
        event,
        RegistryEvent::MessageCreated {
            id,
            creator,
            unlock_timestamp: START_TIME.saturating_add(ONE_HOUR),
            created_at: START_TIME,
        }
    );

    let err = handle.allow(creator, id, recipient).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooEarly);
    let err = handle.allow(stranger, id, recipient).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    fx.advance(ONE_HOUR);
    handle.allow(creator, id, recipient).await?;

    let event = timeout(Duration::from_secs(1), events.recv()).await??;
    assert_eq!(event, RegistryEvent::DecryptionAllowed { id, recipient });

    let views = handle.messages_by_creator(creator).await?;
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].granted_recipient, Some(recipient));
    assert_eq!(handle.get_message_ids_by_creator(creator).await?, vec![id]);

    // Rejected calls emitted nothing in between.
    assert!(events.try_recv().is_err());

    let registry = service.shutdown().await?;
    assert_eq!(registry.message_count()?, 1);
    assert_eq!(
        handle.message_count().await.unwrap_err().kind(),
        ErrorKind::ServiceUnavailable
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_are_serialized() -> Result<()> {
    let fx = TestFixture::new();
    let sink = BroadcastSink::new();
    let service = spawn_service(&fx.clock, &fx.encryption, &sink)?;

    let mut tasks = Vec::new();
    for n in 0..32 {
        let handle = service.handle();
        let request = fx.request(&format!("message {n}"), ONE_HOUR);
        let creator = fx.creator_address();
        tasks.push(tokio::spawn(async move { handle.create(creator, request).await }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await??.get());
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..32).collect::<Vec<_>>());

    let handle = service.handle();
    assert_eq!(handle.message_count().await?, 32);
    assert_eq!(
        handle
            .get_message_ids_by_creator(fx.creator_address())
            .await?
            .len(),
        32
    );
    Ok(())
}
