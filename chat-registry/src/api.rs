//! Client-facing registry API.
//!
//! Every method here builds an operation closing over its arguments and hands
//! it to the owner actor. Nothing in this module touches the registry directly.

use tracing::{debug, warn};

use crate::actor::OwnerHandle;
use crate::client::ClientHandle;
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::registry::Registry;
use crate::types::{ActorState, ActorStats, BroadcastReport, ChatMessage, ClientId};

/// Handle to a chat connection registry owned by a single actor.
///
/// Cheap to clone; all clones talk to the same actor.
pub struct ChatRegistry<C> {
    owner: OwnerHandle<Registry<C>>,
}

impl<C> Clone for ChatRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
        }
    }
}

impl<C: ClientHandle> ChatRegistry<C> {
    /// Spawn a registry actor with [`RegistryConfig::from_env`].
    pub fn spawn() -> Self {
        Self::spawn_with_config(RegistryConfig::from_env())
    }

    pub fn spawn_with_config(config: RegistryConfig) -> Self {
        Self {
            owner: OwnerHandle::spawn(Registry::new(), &config),
        }
    }

    /// Add `handle`, replacing any client already registered under its id.
    pub fn register(&self, handle: C) -> Result<(), RegistryError> {
        self.owner.submit(move |registry| {
            let id = handle.id().clone();
            if registry.insert(handle).is_some() {
                debug!("Replaced existing client {id}");
            } else {
                debug!("Registered client {id}, total: {}", registry.len());
            }
        })
    }

    /// Add `handle` and confirm it, refusing to replace an existing client.
    pub async fn register_unique(&self, handle: C) -> Result<(), RegistryError> {
        self.owner
            .call(move |registry| match registry.try_insert(handle) {
                Ok(()) => Ok(()),
                Err(rejected) => Err(RegistryError::DuplicateClient(rejected.id().clone())),
            })
            .await?
    }

    /// Forget `id`. Removing an absent client is not an error.
    pub fn remove(&self, id: ClientId) -> Result<(), RegistryError> {
        self.owner.submit(move |registry| {
            if registry.remove(&id).is_some() {
                debug!("Removed client {id}, total: {}", registry.len());
            }
        })
    }

    /// Forget several clients in one operation, e.g. the failures of a broadcast.
    pub fn remove_many(
        &self,
        ids: impl IntoIterator<Item = ClientId>,
    ) -> Result<(), RegistryError> {
        let ids: Vec<ClientId> = ids.into_iter().collect();
        self.owner.submit(move |registry| {
            let removed = ids.iter().filter(|id| registry.remove(id).is_some()).count();
            debug!("Removed {removed} of {} client(s)", ids.len());
        })
    }

    /// Write `message` to every registered client and report each outcome.
    ///
    /// A failed write never stops the broadcast and never evicts the client;
    /// callers decide what to do with [`BroadcastReport::failed_ids`].
    pub async fn broadcast(&self, message: ChatMessage) -> Result<BroadcastReport, RegistryError> {
        self.owner
            .call(move |registry| broadcast_to(registry, &message))
            .await
    }

    /// Broadcast without waiting. Failed writes are logged.
    pub fn broadcast_detached(&self, message: ChatMessage) -> Result<(), RegistryError> {
        self.owner.submit(move |registry| {
            let report = broadcast_to(registry, &message);
            for (id, err) in report.failures() {
                warn!("Broadcast to {id} failed: {err}");
            }
        })
    }

    /// Write `message` to the client registered as `id` and wait for the result.
    pub async fn send_to_one(&self, id: ClientId, message: ChatMessage) -> Result<(), RegistryError> {
        self.owner
            .call(move |registry| match registry.get(&id) {
                Some(handle) => handle
                    .write(&message)
                    .map_err(|source| RegistryError::Write { id, source }),
                None => Err(RegistryError::UnknownRecipient(id)),
            })
            .await?
    }

    pub async fn contains(&self, id: ClientId) -> Result<bool, RegistryError> {
        self.owner.call(move |registry| registry.contains(&id)).await
    }

    /// Ids of all registered clients, sorted.
    pub async fn client_ids(&self) -> Result<Vec<ClientId>, RegistryError> {
        self.owner
            .call(|registry| {
                let mut ids: Vec<ClientId> = registry.ids().cloned().collect();
                ids.sort();
                ids
            })
            .await
    }

    pub async fn len(&self) -> Result<usize, RegistryError> {
        self.owner.call(|registry| registry.len()).await
    }

    /// Run arbitrary behaviour against the registry and wait for its result.
    ///
    /// This is how capabilities not covered above are added: as a closure at the
    /// call site, with no change to the actor.
    pub async fn execute<F, R>(&self, f: F) -> Result<R, RegistryError>
    where
        F: FnOnce(&mut Registry<C>) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.owner.call(f).await
    }

    /// Stop accepting operations, drain the queue, and wait for the actor to stop.
    pub async fn shutdown(&self) {
        self.owner.shutdown().await
    }

    pub fn state(&self) -> ActorState {
        self.owner.state()
    }

    pub fn stats(&self) -> ActorStats {
        self.owner.stats()
    }

    pub fn owner(&self) -> &OwnerHandle<Registry<C>> {
        &self.owner
    }
}

fn broadcast_to<C: ClientHandle>(registry: &Registry<C>, message: &ChatMessage) -> BroadcastReport {
    let outcomes = registry
        .handles()
        .map(|handle| (handle.id().clone(), handle.write(message)))
        .collect();
    let report = BroadcastReport::new(outcomes);
    debug!(
        "Broadcast message {} to {} client(s), {} failed",
        message.id,
        report.len(),
        report.failed_ids().len()
    );
    report
}
