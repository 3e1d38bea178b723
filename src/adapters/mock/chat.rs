//! Mock chat transport for testing.
//!
//! Allows tests to script connection outcomes, inject transport events,
//! and verify the join/part/disconnect calls a session makes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::traits::{ChatConnection, ChatError, ChatSink, ChatTransport, TransportEvent};

/// A sink call recorded by the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Join(String),
    Part(String),
    Disconnect,
}

struct MockState {
    connect_count: usize,
    connect_should_fail: bool,
    join_should_fail: bool,
    calls: Vec<SinkCall>,
    /// Event sender for the most recent connection. Dropped on
    /// disconnect so the session's event stream ends like a real close.
    events_tx: Option<mpsc::Sender<TransportEvent>>,
}

/// Scriptable [`ChatTransport`] double.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Clone)]
pub struct MockChatTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockChatTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                connect_count: 0,
                connect_should_fail: false,
                join_should_fail: false,
                calls: Vec::new(),
                events_tx: None,
            })),
        }
    }

    /// Number of connect attempts, including failed ones.
    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connect_count
    }

    /// All sink calls recorded so far.
    pub fn sink_calls(&self) -> Vec<SinkCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_sink_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Configure whether the next connect attempts fail.
    pub fn set_connect_should_fail(&self, should_fail: bool) {
        self.state.lock().unwrap().connect_should_fail = should_fail;
    }

    /// Configure whether join calls fail.
    pub fn set_join_should_fail(&self, should_fail: bool) {
        self.state.lock().unwrap().join_should_fail = should_fail;
    }

    /// Deliver an event to the most recent connection's event stream.
    /// Silently dropped if nothing is connected.
    pub async fn inject(&self, event: TransportEvent) {
        let sender = self.state.lock().unwrap().events_tx.clone();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    /// End the current connection's event stream, as if the server
    /// dropped the socket without a close frame.
    pub fn sever(&self) {
        self.state.lock().unwrap().events_tx = None;
    }
}

impl Default for MockChatTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockChatTransport {
    async fn connect(&self) -> Result<ChatConnection, ChatError> {
        let (events_tx, events_rx) = mpsc::channel(100);

        {
            let mut state = self.state.lock().unwrap();
            state.connect_count += 1;
            if state.connect_should_fail {
                return Err(ChatError::ConnectionFailed(
                    "mock transport configured to fail".to_string(),
                ));
            }
            state.events_tx = Some(events_tx);
        }

        Ok(ChatConnection {
            sink: Arc::new(MockSink {
                state: Arc::clone(&self.state),
            }),
            events: events_rx,
        })
    }
}

struct MockSink {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl ChatSink for MockSink {
    async fn join(&self, channel_login: &str) -> Result<(), ChatError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SinkCall::Join(channel_login.to_string()));
        if state.join_should_fail {
            return Err(ChatError::SendFailed("mock join failure".to_string()));
        }
        Ok(())
    }

    fn part(&self, channel_login: &str) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SinkCall::Part(channel_login.to_string()));
    }

    fn disconnect(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SinkCall::Disconnect);
        state.events_tx = None;
    }
}
