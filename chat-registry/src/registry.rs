//! The owned connection table.
//!
//! `Registry` holds no lock. It is only ever reachable through operations run
//! by the owner actor, which is what makes unsynchronized access sound.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::client::ClientHandle;
use crate::types::ClientId;

/// Mapping from client id to client handle.
pub struct Registry<C> {
    clients: HashMap<ClientId, C>,
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn remove(&mut self, id: &ClientId) -> Option<C> {
        self.clients.remove(id)
    }

    pub fn get(&self, id: &ClientId) -> Option<&C> {
        self.clients.get(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ClientId> {
        self.clients.keys()
    }

    pub fn handles(&self) -> impl Iterator<Item = &C> {
        self.clients.values()
    }
}

impl<C: ClientHandle> Registry<C> {
    /// Insert `handle` under its own id, returning the handle it replaced.
    pub fn insert(&mut self, handle: C) -> Option<C> {
        self.clients.insert(handle.id().clone(), handle)
    }

    /// Insert `handle` only if its id is free. On conflict the handle is given back.
    pub fn try_insert(&mut self, handle: C) -> Result<(), C> {
        match self.clients.entry(handle.id().clone()) {
            Entry::Occupied(_) => Err(handle),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}
