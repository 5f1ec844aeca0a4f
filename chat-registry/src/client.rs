//! Client handles: the registry's only view of a connected peer.

use tokio::sync::mpsc;

use crate::error::WriteError;
use crate::types::{ChatMessage, ClientId};

/// A reference to one connected peer.
///
/// The registry only ever asks a handle for its id and asks it to write a
/// message. Owning the underlying connection (and keeping it safe for concurrent
/// use) is the connection layer's business.
pub trait ClientHandle: Send + 'static {
    fn id(&self) -> &ClientId;

    fn write(&self, message: &ChatMessage) -> Result<(), WriteError>;
}

/// Client handle backed by an unbounded channel.
///
/// The connection layer keeps the receiving end and forwards whatever arrives to
/// the socket. Once the receiver is dropped, writes fail with
/// [`WriteError::Disconnected`].
#[derive(Debug, Clone)]
pub struct ChannelClient {
    id: ClientId,
    outbound_tx: mpsc::UnboundedSender<ChatMessage>,
}

impl ChannelClient {
    pub fn new(id: ClientId, outbound_tx: mpsc::UnboundedSender<ChatMessage>) -> Self {
        Self { id, outbound_tx }
    }

    /// Create a handle together with the receiver its messages arrive on.
    pub fn pair(id: impl Into<ClientId>) -> (Self, mpsc::UnboundedReceiver<ChatMessage>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (Self::new(id.into(), outbound_tx), outbound_rx)
    }

    pub fn is_connected(&self) -> bool {
        !self.outbound_tx.is_closed()
    }
}

impl ClientHandle for ChannelClient {
    fn id(&self) -> &ClientId {
        &self.id
    }

    fn write(&self, message: &ChatMessage) -> Result<(), WriteError> {
        self.outbound_tx
            .send(message.clone())
            .map_err(|_| WriteError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_reaches_receiver() {
        let (client, mut rx) = ChannelClient::pair("alice");
        let message = ChatMessage::new("hello");

        client.write(&message).unwrap();

        assert_eq!(rx.try_recv().unwrap(), message);
        assert_eq!(client.id().as_str(), "alice");
    }

    #[test]
    fn test_write_after_disconnect_fails() {
        let (client, rx) = ChannelClient::pair("bob");
        drop(rx);

        assert!(!client.is_connected());
        assert_eq!(
            client.write(&ChatMessage::new("anyone there?")),
            Err(WriteError::Disconnected)
        );
    }
}
