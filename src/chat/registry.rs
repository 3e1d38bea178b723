//! Channel-keyed session registry driven by presenter lifecycles.
//!
//! The registry guarantees at most one live [`ChatSession`] per channel,
//! no matter how many presenters attach concurrently. Each entry pairs a
//! session with a [`PresenceManager`] and a driver task that translates
//! presence transitions into connect/disconnect calls: first presenter
//! connects, sustained invisibility (debounce elapsed with no presenters)
//! disconnects and removes the entry. A later attach builds a fresh entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, Weak};

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::log::ChatConfig;
use super::session::ChatSession;
use crate::emotes::EmoteStore;
use crate::models::{ChannelHandle, ChannelId};
use crate::presence::{PresenceConfig, PresenceEvent, PresenceManager, PresenterRole, PresenterToken};
use crate::traits::ChatTransport;

struct ChannelEntry {
    session: ChatSession,
    presence: PresenceManager,
    driver: AbortHandle,
}

struct RegistryInner {
    transport: Arc<dyn ChatTransport>,
    emotes: EmoteStore,
    chat_config: ChatConfig,
    presence_config: PresenceConfig,

    /// Creation and teardown are serialized under this lock; that is what
    /// makes single-instance-per-key hold under concurrent attaches.
    channels: StdMutex<HashMap<ChannelId, ChannelEntry>>,
}

/// Registry of chat sessions, one per channel. Cheap to clone.
#[derive(Clone)]
pub struct ChatRegistry {
    inner: Arc<RegistryInner>,
}

impl ChatRegistry {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        emotes: EmoteStore,
        chat_config: ChatConfig,
        presence_config: PresenceConfig,
    ) -> Self {
        ChatRegistry {
            inner: Arc::new(RegistryInner {
                transport,
                emotes,
                chat_config,
                presence_config,
                channels: StdMutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a presenter for a channel, creating the session and its
    /// driver on first attach. Every concurrent caller for the same
    /// channel gets the same session instance.
    pub fn attach(
        &self,
        channel: &ChannelHandle,
        role: PresenterRole,
    ) -> (ChatSession, PresenterToken) {
        let mut channels = self.inner.channels.lock().unwrap();
        let entry = channels.entry(channel.id.clone()).or_insert_with(|| {
            tracing::debug!(channel = %channel.login, "creating chat session");
            let session = ChatSession::new(
                channel.clone(),
                &self.inner.chat_config,
                Arc::clone(&self.inner.transport),
                self.inner.emotes.clone(),
            );
            let (presence, events) = PresenceManager::new(self.inner.presence_config.clone());
            let driver =
                spawn_driver(Arc::downgrade(&self.inner), channel.clone(), session.clone(), events);
            ChannelEntry {
                session,
                presence,
                driver,
            }
        });

        let token = entry.presence.attach(role);
        (entry.session.clone(), token)
    }

    /// Remove a presenter. The session survives a debounce window after
    /// the last detach before it is torn down.
    pub fn detach(&self, channel_id: &ChannelId, token: PresenterToken) {
        let channels = self.inner.channels.lock().unwrap();
        match channels.get(channel_id) {
            Some(entry) => entry.presence.detach(token),
            None => tracing::warn!(channel = %channel_id, "detach for unknown channel"),
        }
    }

    /// Change a presenter's role without affecting the presence count.
    pub fn update_role(&self, channel_id: &ChannelId, token: PresenterToken, role: PresenterRole) {
        let channels = self.inner.channels.lock().unwrap();
        match channels.get(channel_id) {
            Some(entry) => entry.presence.update_role(token, role),
            None => tracing::warn!(channel = %channel_id, "role update for unknown channel"),
        }
    }

    /// Reconnect every session that is currently meant to be visible.
    /// Called when the application returns to the foreground; connections
    /// dropped while backgrounded come back without presenter churn.
    pub fn handle_app_activated(&self) {
        let sessions: Vec<ChatSession> = {
            let channels = self.inner.channels.lock().unwrap();
            channels
                .values()
                .filter(|entry| entry.presence.snapshot().visible)
                .map(|entry| entry.session.clone())
                .collect()
        };

        for session in sessions {
            tokio::spawn(async move {
                if let Err(err) = session.connect().await {
                    tracing::warn!(
                        channel = %session.channel().login,
                        error = %err,
                        "reconnect on activation failed"
                    );
                }
            });
        }
    }

    /// Look up the live session for a channel, if one exists.
    pub fn session(&self, channel_id: &ChannelId) -> Option<ChatSession> {
        let channels = self.inner.channels.lock().unwrap();
        channels.get(channel_id).map(|entry| entry.session.clone())
    }

    pub fn session_count(&self) -> usize {
        self.inner.channels.lock().unwrap().len()
    }

    /// Tear down every session and driver immediately, skipping debounce.
    pub fn shutdown(&self) {
        let entries: Vec<ChannelEntry> = {
            let mut channels = self.inner.channels.lock().unwrap();
            channels.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            entry.driver.abort();
            entry.session.close();
        }
    }
}

/// Translate presence events into session lifecycle calls.
///
/// Holds only a weak registry reference: the driver must not keep the
/// registry alive, and a dead registry ends the loop.
fn spawn_driver(
    registry: Weak<RegistryInner>,
    channel: ChannelHandle,
    session: ChatSession,
    mut events: mpsc::UnboundedReceiver<PresenceEvent>,
) -> AbortHandle {
    let task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PresenceEvent::BecameVisible => {
                    if let Err(err) = session.connect().await {
                        tracing::warn!(
                            channel = %channel.login,
                            error = %err,
                            "chat connect failed"
                        );
                    }
                }
                PresenceEvent::BecameHidden => {
                    let Some(registry) = registry.upgrade() else {
                        break;
                    };
                    let torn_down = {
                        let mut channels = registry.channels.lock().unwrap();
                        // An attach may have raced this event; only tear
                        // down if the manager still reports hidden.
                        let still_hidden = channels.get(&channel.id).is_some_and(|entry| {
                            let snapshot = entry.presence.snapshot();
                            snapshot.presenter_count == 0 && !snapshot.visible
                        });
                        if still_hidden {
                            channels.remove(&channel.id);
                        }
                        still_hidden
                    };
                    if torn_down {
                        // close, not disconnect: a reconnect spawned by
                        // activation may still be in flight, and it must
                        // not revive a session the registry no longer
                        // holds.
                        session.close();
                        tracing::debug!(
                            channel = %channel.login,
                            "session removed after sustained invisibility"
                        );
                        break;
                    }
                }
                PresenceEvent::RolesChanged(roles) => {
                    tracing::debug!(channel = %channel.login, ?roles, "presenter roles changed");
                }
            }
        }
    });
    task.abort_handle()
}
