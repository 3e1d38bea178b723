//! Chat transport trait abstraction.
//!
//! Provides a trait-based abstraction over the IRC-over-WebSocket chat
//! connection, enabling dependency injection and mocking in tests. A
//! transport hands out independent connections; each connection pairs a
//! command sink with an event stream owned by exactly one reader.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{CoreError, NetworkError};
use crate::models::InboundMessage;

/// Chat transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Connection or handshake failed
    ConnectionFailed(String),
    /// Failed to send a command on an open connection
    SendFailed(String),
    /// The connection is closed
    Closed,
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            ChatError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            ChatError::Closed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<ChatError> for CoreError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::ConnectionFailed(message) => {
                CoreError::Network(NetworkError::ConnectionFailed {
                    url: "chat".to_string(),
                    message,
                })
            }
            ChatError::SendFailed(message) => CoreError::Network(NetworkError::Other { message }),
            ChatError::Closed => CoreError::Network(NetworkError::ConnectionFailed {
                url: "chat".to_string(),
                message: "connection closed".to_string(),
            }),
        }
    }
}

/// Events surfaced by a live chat connection.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A chat message arrived on a joined channel.
    Message(InboundMessage),

    /// A server notice (join failures, rate limits).
    Notice(String),

    /// The connection ended. No further events will arrive.
    Closed,
}

/// A live chat connection: a sink for commands plus the event stream.
///
/// The receiver is taken by the single reader task; the sink may be cloned
/// and used from anywhere.
pub struct ChatConnection {
    pub sink: Arc<dyn ChatSink>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Trait for establishing chat connections.
///
/// Each call to `connect` yields an independent connection. Implementations
/// perform the full handshake (authentication, capability negotiation)
/// before returning.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<ChatConnection, ChatError>;
}

/// Trait for channel membership operations on a live connection.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Join a channel by login name. Messages for the channel flow on the
    /// connection's event stream once the join is acknowledged.
    async fn join(&self, channel_login: &str) -> Result<(), ChatError>;

    /// Leave a channel. Fire-and-forget; errors after teardown are moot.
    fn part(&self, channel_login: &str);

    /// Close the connection. Fire-and-forget.
    fn disconnect(&self);
}
