//! Service container wiring the runtime together.
//!
//! [`CoreServices`] explicitly constructs and owns every
//! application-lifetime service. There are no global singletons: tests
//! build a fresh container per case, and the embedding application keeps
//! exactly one for its lifetime.

use std::sync::Arc;

use crate::chat::{ChatConfig, ChatRegistry};
use crate::emotes::{EmoteProviderConfig, EmoteStore};
use crate::helix::{HelixClient, HELIX_BASE_URL};
use crate::presence::PresenceConfig;
use crate::traits::ChatTransport;

/// Configuration for the whole runtime. `Default` matches production.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub chat: ChatConfig,
    pub presence: PresenceConfig,
    pub emotes: EmoteProviderConfig,
    pub helix_base_url: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            chat: ChatConfig::default(),
            presence: PresenceConfig::default(),
            emotes: EmoteProviderConfig::default(),
            helix_base_url: HELIX_BASE_URL.to_string(),
        }
    }
}

/// Application-lifetime services. Cheap to clone; clones share the
/// underlying stores and registry.
#[derive(Clone)]
pub struct CoreServices {
    config: CoreConfig,
    emotes: EmoteStore,
    chat: ChatRegistry,
}

impl CoreServices {
    /// Build the container around a chat transport. The transport is the
    /// only injected collaborator; everything else is constructed here
    /// from the config.
    pub fn new(config: CoreConfig, transport: Arc<dyn ChatTransport>) -> Self {
        let emotes = EmoteStore::new(config.emotes.clone());
        let chat = ChatRegistry::new(
            transport,
            emotes.clone(),
            config.chat.clone(),
            config.presence.clone(),
        );

        CoreServices {
            config,
            emotes,
            chat,
        }
    }

    pub fn chat(&self) -> &ChatRegistry {
        &self.chat
    }

    pub fn emotes(&self) -> &EmoteStore {
        &self.emotes
    }

    /// Build a Helix client for the given credentials. Clients are
    /// per-credential and disposable; a new one is built after every
    /// account switch.
    pub fn helix(&self, client_id: impl Into<String>, token: impl Into<String>) -> HelixClient {
        HelixClient::with_base_url(self.config.helix_base_url.clone(), client_id, token)
    }

    /// Foreground-reconnect hook: restores chat connections for every
    /// channel that is still meant to be visible.
    pub fn handle_app_activated(&self) {
        tracing::debug!("application activated, restoring visible chat sessions");
        self.chat.handle_app_activated();
    }

    /// Warm the global emote catalog ahead of the first chat connect.
    pub async fn prefetch_global_emotes(&self) {
        self.emotes.fetch_global_emotes().await;
    }

    /// Tear down every live chat session immediately.
    pub fn shutdown(&self) {
        self.chat.shutdown();
    }
}
