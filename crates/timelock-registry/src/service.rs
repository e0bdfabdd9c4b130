//! Async access to a registry shared between tasks.
//!
//! The registry is moved into a tokio task that owns it exclusively. Callers
//! talk to it through a cloneable [`RegistryHandle`]: each call is a command
//! on an mpsc queue with a oneshot reply. Commands run one at a time, in
//! arrival order.

use timelock_core::{Address, CreateMessage, MessageView, RecordId};
use timelock_store::Store;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{RegistryError, Result};
use crate::registry::MessageRegistry;

/// Commands processed by the registry task.
enum Command {
    Create {
        caller: Address,
        request: CreateMessage,
        reply: oneshot::Sender<Result<RecordId>>,
    },
    Allow {
        caller: Address,
        id: RecordId,
        recipient: Address,
        reply: oneshot::Sender<Result<()>>,
    },
    GetMessage {
        id: RecordId,
        reply: oneshot::Sender<Result<MessageView>>,
    },
    IdsByCreator {
        creator: Address,
        reply: oneshot::Sender<Result<Vec<RecordId>>>,
    },
    MessagesByCreator {
        creator: Address,
        reply: oneshot::Sender<Result<Vec<MessageView>>>,
    },
    Count(oneshot::Sender<Result<u64>>),
    Shutdown,
}

/// A running registry task.
pub struct RegistryService<S: Store + 'static> {
    handle: RegistryHandle,
    task: JoinHandle<MessageRegistry<S>>,
}

impl<S: Store + 'static> RegistryService<S> {
    /// Move `registry` into a new task on the current tokio runtime.
    ///
    /// The command queue holds `config().mailbox_capacity` commands; callers
    /// wait when it is full.
    pub fn spawn(registry: MessageRegistry<S>) -> Self {
        let capacity = registry.config().mailbox_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let task = tokio::spawn(run_registry_loop(registry, rx));
        tracing::debug!(capacity, "registry service started");

        Self {
            handle: RegistryHandle { tx },
            task,
        }
    }

    /// A new handle to the running task.
    pub fn handle(&self) -> RegistryHandle {
        self.handle.clone()
    }

    /// Stop the task after the commands already queued, and take the
    /// registry back. Outstanding handles fail with `ServiceUnavailable`.
    pub async fn shutdown(self) -> Result<MessageRegistry<S>> {
        // A closed queue means the loop already exited.
        let _ = self.handle.tx.send(Command::Shutdown).await;
        self.task
            .await
            .map_err(|_| RegistryError::ServiceUnavailable)
    }
}

/// Process commands until shutdown or until every handle is dropped.
async fn run_registry_loop<S: Store>(
    mut registry: MessageRegistry<S>,
    mut rx: mpsc::Receiver<Command>,
) -> MessageRegistry<S> {
    while let Some(command) = rx.recv().await {
        // Replies to callers that stopped waiting are dropped.
        match command {
            Command::Create {
                caller,
                request,
                reply,
            } => {
                let _ = reply.send(log_failure(registry.create(caller, request)));
            }
            Command::Allow {
                caller,
                id,
                recipient,
                reply,
            } => {
                let _ = reply.send(log_failure(registry.allow(caller, id, recipient)));
            }
            Command::GetMessage { id, reply } => {
                let _ = reply.send(log_failure(registry.get_message(id)));
            }
            Command::IdsByCreator { creator, reply } => {
                let _ = reply.send(log_failure(registry.get_message_ids_by_creator(&creator)));
            }
            Command::MessagesByCreator { creator, reply } => {
                let _ = reply.send(log_failure(registry.messages_by_creator(&creator)));
            }
            Command::Count(reply) => {
                let _ = reply.send(log_failure(registry.message_count()));
            }
            Command::Shutdown => break,
        }
    }

    tracing::debug!("registry service stopped");
    registry
}

/// Log backend failures. Rule rejections are logged where they happen.
fn log_failure<T>(result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        if !err.is_rejection() {
            tracing::error!(error = %err, "registry command failed");
        }
    }
    result
}

/// Cloneable async front end of a [`RegistryService`].
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<Command>,
}

impl RegistryHandle {
    /// See [`MessageRegistry::create`].
    pub async fn create(&self, caller: Address, request: CreateMessage) -> Result<RecordId> {
        self.call(|reply| Command::Create {
            caller,
            request,
            reply,
        })
        .await
    }

    /// See [`MessageRegistry::allow`].
    pub async fn allow(&self, caller: Address, id: RecordId, recipient: Address) -> Result<()> {
        self.call(|reply| Command::Allow {
            caller,
            id,
            recipient,
            reply,
        })
        .await
    }

    /// See [`MessageRegistry::get_message`].
    pub async fn get_message(&self, id: RecordId) -> Result<MessageView> {
        self.call(|reply| Command::GetMessage { id, reply }).await
    }

    /// See [`MessageRegistry::get_message_ids_by_creator`].
    pub async fn get_message_ids_by_creator(&self, creator: Address) -> Result<Vec<RecordId>> {
        self.call(|reply| Command::IdsByCreator { creator, reply })
            .await
    }

    /// See [`MessageRegistry::messages_by_creator`].
    pub async fn messages_by_creator(&self, creator: Address) -> Result<Vec<MessageView>> {
        self.call(|reply| Command::MessagesByCreator { creator, reply })
            .await
    }

    /// See [`MessageRegistry::message_count`].
    pub async fn message_count(&self) -> Result<u64> {
        self.call(Command::Count).await
    }

    /// Whether the registry task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| RegistryError::ServiceUnavailable)?;
        rx.await.map_err(|_| RegistryError::ServiceUnavailable)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;
    use std::sync::Arc;
    use timelock_core::{EncryptedHandle, InputProof, ManualClock, Timestamp};
    use timelock_store::MemoryStore;

    const CREATOR: Address = Address([1; 20]);
    const RECIPIENT: Address = Address([2; 20]);

    fn registry(clock: &ManualClock) -> MessageRegistry<MemoryStore> {
        MessageRegistry::builder(MemoryStore::new())
            .config(RegistryConfig {
                mailbox_capacity: 4,
                ..RegistryConfig::default()
            })
            .clock(Arc::new(clock.clone()))
            .build()
    }

    fn request(unlock: u64) -> CreateMessage {
        CreateMessage::new(
            "Hello",
            b"ciphertext".to_vec(),
            EncryptedHandle::from_bytes([9; 32]),
            InputProof::empty(),
            Timestamp::from_secs(unlock),
        )
    }

    #[tokio::test]
    async fn test_service_round_trip() {
        let clock = ManualClock::new(Timestamp::from_secs(100));
        let service = RegistryService::spawn(registry(&clock));
        let handle = service.handle();

        let id = handle.create(CREATOR, request(200)).await.unwrap();
        assert_eq!(handle.message_count().await.unwrap(), 1);

        clock.advance(100);
        handle.allow(CREATOR, id, RECIPIENT).await.unwrap();

        let view = handle.get_message(id).await.unwrap();
        assert_eq!(view.granted_recipient, Some(RECIPIENT));

        let registry = service.shutdown().await.unwrap();
        assert_eq!(registry.message_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_handle_after_shutdown() {
        let clock = ManualClock::new(Timestamp::from_secs(100));
        let service = RegistryService::spawn(registry(&clock));
        let handle = service.handle();

        service.shutdown().await.unwrap();

        assert!(!handle.is_running());
        let err = handle.message_count().await.unwrap_err();
        assert!(matches!(err, RegistryError::ServiceUnavailable));
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_ids() {
        let clock = ManualClock::new(Timestamp::from_secs(100));
        let service = RegistryService::spawn(registry(&clock));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let handle = service.handle();
            tasks.push(tokio::spawn(async move {
                handle.create(CREATOR, request(200)).await
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().get());
        }
        ids.sort_unstable();
        assert_eq!(ids, (0..16).collect::<Vec<_>>());

        let handle = service.handle();
        let listed = handle.get_message_ids_by_creator(CREATOR).await.unwrap();
        assert_eq!(listed.len(), 16);
    }
}
