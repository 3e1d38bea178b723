//! One logical chat connection per channel, feeding a bounded log.

use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::{broadcast, Mutex as TokioMutex};
use tokio::task::AbortHandle;

use super::chunker::build_message;
use super::log::{ChatConfig, ChatLog};
use crate::emotes::EmoteStore;
use crate::error::CoreError;
use crate::models::{ChannelHandle, ChatEntry};
use crate::traits::{ChatSink, ChatTransport, TransportEvent};

/// Capacity of the session's event fan-out. Slow subscribers start losing
/// the oldest notifications past this point; the log itself never loses
/// entries to a lagging observer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notifications emitted as the log changes.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// An entry was appended to the log.
    Appended(ChatEntry),

    /// A batch of oldest entries was evicted; observers should reset any
    /// scroll anchoring based on entry indices.
    Pruned { removed: usize },

    /// The connection ended, by request or transport failure.
    Disconnected,
}

struct ConnectionHandle {
    sink: Arc<dyn ChatSink>,
    reader: AbortHandle,
}

struct SessionState {
    log: ChatLog,
    connection: Option<ConnectionHandle>,

    /// Bumped on every teardown. A connect in flight across a teardown
    /// carries the old value and must discard its connection instead of
    /// storing it.
    connect_epoch: u64,

    /// Set when the session is retired for good; `connect` refuses from
    /// then on.
    closed: bool,
}

struct SessionInner {
    channel: ChannelHandle,
    transport: Arc<dyn ChatTransport>,
    emotes: EmoteStore,
    state: StdMutex<SessionState>,

    /// Serializes `connect` so concurrent callers cannot open two
    /// transport connections for one session.
    connect_lock: TokioMutex<()>,
    events_tx: broadcast::Sender<ChatEvent>,
}

/// A chat session for one channel. Cheap to clone; all clones share the
/// same connection and log.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    pub fn new(
        channel: ChannelHandle,
        config: &ChatConfig,
        transport: Arc<dyn ChatTransport>,
        emotes: EmoteStore,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ChatSession {
            inner: Arc::new(SessionInner {
                channel,
                transport,
                emotes,
                state: StdMutex::new(SessionState {
                    log: ChatLog::new(config),
                    connection: None,
                    connect_epoch: 0,
                    closed: false,
                }),
                connect_lock: TokioMutex::new(()),
                events_tx,
            }),
        }
    }

    pub fn channel(&self) -> &ChannelHandle {
        &self.inner.channel
    }

    /// Subscribe to log change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Snapshot of the current log contents.
    pub fn entries(&self) -> Vec<ChatEntry> {
        self.inner.state.lock().unwrap().log.to_vec()
    }

    pub fn is_connected(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state
            .connection
            .as_ref()
            .is_some_and(|conn| !conn.reader.is_finished())
    }

    /// Two handles for the same underlying session.
    pub fn ptr_eq(&self, other: &ChatSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Open the transport connection, join the channel, and start the read
    /// loop. No-op if already connected with a live reader. Restartable
    /// after [`disconnect`].
    ///
    /// Emote catalogs are refreshed first so chunking sees them from the
    /// first message; the global fetch is a no-op when already populated.
    ///
    /// [`disconnect`]: ChatSession::disconnect
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _guard = self.inner.connect_lock.lock().await;

        // The epoch is stamped in the same critical section as the
        // liveness check; any teardown between here and the store below
        // bumps it.
        let epoch = {
            let state = self.inner.state.lock().unwrap();
            if state.closed {
                tracing::debug!(channel = %self.inner.channel.login, "session retired, ignoring connect");
                return Ok(());
            }
            let live = state
                .connection
                .as_ref()
                .is_some_and(|conn| !conn.reader.is_finished());
            if live {
                tracing::debug!(channel = %self.inner.channel.login, "already connected");
                return Ok(());
            }
            state.connect_epoch
        };

        tokio::join!(
            self.inner.emotes.fetch_global_emotes(),
            self.inner.emotes.fetch_channel_emotes(&self.inner.channel.id),
        );

        let connection = self.inner.transport.connect().await?;
        connection.sink.join(&self.inner.channel.login).await?;

        let reader = {
            let inner = Arc::clone(&self.inner);
            let mut events = connection.events;
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Some(TransportEvent::Message(message)) => {
                            if message.channel_login == inner.channel.login {
                                inner.append_message(message);
                            }
                        }
                        Some(TransportEvent::Notice(notice)) => {
                            tracing::debug!(channel = %inner.channel.login, notice, "chat notice");
                        }
                        Some(TransportEvent::Closed) | None => break,
                    }
                }
                // Transport ended on its own; clear state so a later
                // connect() starts fresh. No divider here: only an
                // explicit disconnect marks a gap.
                tracing::debug!(channel = %inner.channel.login, "read loop ended");
                inner.state.lock().unwrap().connection = None;
                let _ = inner.events_tx.send(ChatEvent::Disconnected);
            })
        };

        let mut state = self.inner.state.lock().unwrap();
        if state.closed || state.connect_epoch != epoch {
            drop(state);
            // Torn down while this connect was awaiting. The fresh
            // connection must not outlive the session; discard it.
            reader.abort();
            connection.sink.part(&self.inner.channel.login);
            connection.sink.disconnect();
            tracing::debug!(
                channel = %self.inner.channel.login,
                "connect superseded by teardown, discarding connection"
            );
            return Ok(());
        }
        state.connection = Some(ConnectionHandle {
            sink: connection.sink,
            reader: reader.abort_handle(),
        });
        tracing::info!(channel = %self.inner.channel.login, "chat connected");
        Ok(())
    }

    /// Cancel the read loop, issue a best-effort part, and append a
    /// divider unless the log is empty or already ends with one.
    ///
    /// Synchronous: teardown must not wait on the network. Safe to call
    /// when already disconnected; the divider rule makes repeats a no-op.
    pub fn disconnect(&self) {
        self.retire(false);
    }

    /// [`disconnect`], then refuse every future connect. For sessions
    /// whose registry entry is gone: without the fuse, a connect still in
    /// flight at removal could land afterwards and hold a connection
    /// nothing can reach.
    ///
    /// [`disconnect`]: ChatSession::disconnect
    pub(crate) fn close(&self) {
        self.retire(true);
    }

    fn retire(&self, terminal: bool) {
        let mut state = self.inner.state.lock().unwrap();
        state.connect_epoch += 1;
        if terminal {
            state.closed = true;
        }
        let connection = state.connection.take();

        if let Some(connection) = &connection {
            connection.reader.abort();
            connection.sink.part(&self.inner.channel.login);
            connection.sink.disconnect();
            tracing::info!(channel = %self.inner.channel.login, "chat disconnected");
        }

        let at = Utc::now();
        let appended = state.log.append_divider(at);
        drop(state);

        if appended {
            let _ = self
                .inner
                .events_tx
                .send(ChatEvent::Appended(ChatEntry::Divider(at)));
        }
        // Notify only when a connection actually came down; repeat or
        // never-connected teardowns stay silent.
        if connection.is_some() {
            let _ = self.inner.events_tx.send(ChatEvent::Disconnected);
        }
    }
}

impl SessionInner {
    /// Chunk, append, and notify. Runs on the read-loop task; the state
    /// lock serializes appends against snapshots.
    fn append_message(&self, message: crate::models::InboundMessage) {
        let emotes = self.emotes.clone();
        let channel_id = self.channel.id.clone();
        let chat_message = build_message(message, |word| emotes.emote(word, &channel_id));

        let entry = ChatEntry::Message(chat_message);
        let removed = {
            let mut state = self.state.lock().unwrap();
            state.log.push(entry.clone())
        };

        let _ = self.events_tx.send(ChatEvent::Appended(entry));
        if let Some(removed) = removed {
            let _ = self.events_tx.send(ChatEvent::Pruned { removed });
        }
    }
}
