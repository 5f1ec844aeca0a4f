//! Error types reported by the registry actor and its client-facing API.

use std::time::Duration;

use thiserror::Error;

use crate::types::ClientId;

/// Failure reported by a [`ClientHandle`](crate::ClientHandle) when a message
/// cannot be delivered to its peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The peer's outbound sink has been closed.
    #[error("client disconnected")]
    Disconnected,

    /// The connection layer refused the message.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Everything a caller of the registry can observe going wrong.
///
/// `UnknownRecipient`, `DuplicateClient` and `Write` are ordinary outcomes of an
/// operation. `Closed` and `Timeout` are synthesized by the queue layer when a
/// request cannot be serviced. `Defect` carries the panic message of an operation
/// whose own logic failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown recipient `{0}`")]
    UnknownRecipient(ClientId),

    #[error("client `{0}` is already registered")]
    DuplicateClient(ClientId),

    #[error("failed to write to client `{id}`: {source}")]
    Write {
        id: ClientId,
        #[source]
        source: WriteError,
    },

    #[error("registry actor is closed")]
    Closed,

    #[error("no reply from registry actor after {0:?}")]
    Timeout(Duration),

    #[error("operation panicked: {0}")]
    Defect(String),
}

impl RegistryError {
    /// True for the failures produced by shutdown or a vanished actor.
    pub fn is_closed(&self) -> bool {
        matches!(self, RegistryError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_display_includes_client() {
        let err = RegistryError::Write {
            id: ClientId::from("alice"),
            source: WriteError::Disconnected,
        };
        assert_eq!(
            err.to_string(),
            "failed to write to client `alice`: client disconnected"
        );
    }

    #[test]
    fn test_is_closed() {
        assert!(RegistryError::Closed.is_closed());
        assert!(!RegistryError::UnknownRecipient(ClientId::from("bob")).is_closed());
    }
}
