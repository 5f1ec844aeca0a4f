//! Shared types for the chat registry
//!
//! Client ids and chat messages cross the boundary to the connection layer,
//! so they are serde-serializable. Everything else stays in-process.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WriteError;

/// Unique key of a connected peer in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random id for a peer that did not bring its own.
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A chat message handed to client handles. The registry never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique id, useful for deduplication on the receiving side
    pub id: String,

    /// Originating client, `None` for server notices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ClientId>,

    /// Message body
    pub content: String,
}

impl ChatMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: None,
            content: content.into(),
        }
    }

    pub fn from_client(from: ClientId, content: impl Into<String>) -> Self {
        Self {
            from: Some(from),
            ..Self::new(content)
        }
    }
}

/// Observable state of an owner actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// Waiting for the next operation or the shutdown marker
    Running,
    /// Invoking an operation with exclusive access to the owned state
    Executing,
    /// Terminal; the queue is closed
    Stopped,
}

/// Counters maintained by an owner actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorStats {
    /// Operations that ran to completion or panicked
    pub executed: u64,
    /// Operations that panicked
    pub defects: u64,
}

/// Per-client outcome of a broadcast, one entry per client registered when the
/// broadcast ran. Entries are ordered by client id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    outcomes: Vec<(ClientId, Result<(), WriteError>)>,
}

impl BroadcastReport {
    pub(crate) fn new(mut outcomes: Vec<(ClientId, Result<(), WriteError>)>) -> Self {
        outcomes.sort_by(|(a, _), (b, _)| a.cmp(b));
        Self { outcomes }
    }

    /// Number of clients the broadcast was attempted on.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True when every write succeeded (vacuously true for an empty registry).
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_ok())
    }

    pub fn outcomes(&self) -> &[(ClientId, Result<(), WriteError>)] {
        &self.outcomes
    }

    /// Outcome for a single client, `None` if it was not part of the broadcast.
    pub fn outcome(&self, id: &ClientId) -> Option<&Result<(), WriteError>> {
        self.outcomes
            .iter()
            .find(|(entry, _)| entry == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn delivered(&self) -> impl Iterator<Item = &ClientId> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(id, _)| id)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ClientId, &WriteError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.as_ref().err().map(|err| (id, err)))
    }

    /// Ids whose write failed, ready to be passed to `remove_many`.
    pub fn failed_ids(&self) -> Vec<ClientId> {
        self.failures().map(|(id, _)| id.clone()).collect()
    }
}
