//! Third-party emote aggregation.
//!
//! An [`EmoteStore`] holds one global catalog and one catalog per channel,
//! merged from three independent providers (7TV, BetterTTV, FrankerFaceZ).
//! Provider failures are absorbed: a provider that errors contributes zero
//! emotes and the aggregate fetch still completes. Name collisions resolve
//! by provider rank (7TV over BetterTTV over FrankerFaceZ); equal rank
//! keeps the incumbent.

mod better_ttv;
mod franker_face_z;
mod seven_tv;

pub use better_ttv::{BetterTtvClient, BETTER_TTV_BASE_URL};
pub use franker_face_z::{FrankerFaceZClient, FRANKER_FACE_Z_BASE_URL};
pub use seven_tv::{SevenTvClient, SEVEN_TV_BASE_URL};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as TokioMutex;

use crate::error::CoreError;
use crate::models::{ChannelId, Emote, EmoteMap, EmoteProvider};

/// Provider endpoints, overridable for tests.
#[derive(Debug, Clone)]
pub struct EmoteProviderConfig {
    pub seven_tv_base_url: String,
    pub better_ttv_base_url: String,
    pub franker_face_z_base_url: String,
}

impl Default for EmoteProviderConfig {
    fn default() -> Self {
        EmoteProviderConfig {
            seven_tv_base_url: SEVEN_TV_BASE_URL.to_string(),
            better_ttv_base_url: BETTER_TTV_BASE_URL.to_string(),
            franker_face_z_base_url: FRANKER_FACE_Z_BASE_URL.to_string(),
        }
    }
}

struct Catalogs {
    global: EmoteMap,
    per_channel: HashMap<ChannelId, EmoteMap>,
}

struct StoreInner {
    seven_tv: SevenTvClient,
    better_ttv: BetterTtvClient,
    franker_face_z: FrankerFaceZClient,
    catalogs: StdMutex<Catalogs>,

    /// Serializes global fetches so concurrent callers do not race the
    /// populated check into duplicate provider requests.
    global_fetch: TokioMutex<()>,
}

/// Aggregated emote catalogs. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct EmoteStore {
    inner: Arc<StoreInner>,
}

impl EmoteStore {
    pub fn new(config: EmoteProviderConfig) -> Self {
        EmoteStore {
            inner: Arc::new(StoreInner {
                seven_tv: SevenTvClient::with_base_url(config.seven_tv_base_url),
                better_ttv: BetterTtvClient::with_base_url(config.better_ttv_base_url),
                franker_face_z: FrankerFaceZClient::with_base_url(config.franker_face_z_base_url),
                catalogs: StdMutex::new(Catalogs {
                    global: HashMap::new(),
                    per_channel: HashMap::new(),
                }),
                global_fetch: TokioMutex::new(()),
            }),
        }
    }

    /// Populate the global catalog from all three providers in parallel.
    ///
    /// Idempotent: a no-op once the catalog is non-empty. Provider errors
    /// are logged and contribute nothing.
    pub async fn fetch_global_emotes(&self) {
        let _guard = self.inner.global_fetch.lock().await;
        if !self.inner.catalogs.lock().unwrap().global.is_empty() {
            tracing::debug!("global emote catalog already populated");
            return;
        }

        let (seven_tv, better_ttv, franker_face_z) = tokio::join!(
            self.inner.seven_tv.global_emotes(),
            self.inner.better_ttv.global_emotes(),
            self.inner.franker_face_z.global_emotes(),
        );

        let mut merged = HashMap::new();
        merge_ranked(&mut merged, absorb(seven_tv, EmoteProvider::SevenTv));
        merge_ranked(&mut merged, absorb(better_ttv, EmoteProvider::BetterTtv));
        merge_ranked(
            &mut merged,
            absorb(franker_face_z, EmoteProvider::FrankerFaceZ),
        );

        tracing::info!(count = merged.len(), "global emote catalog loaded");
        self.inner.catalogs.lock().unwrap().global = merged;
    }

    /// Refresh a channel's catalog from all three providers in parallel,
    /// fully replacing any prior catalog for that channel. Never cached:
    /// channel emote sets change often enough that each connect refetches.
    pub async fn fetch_channel_emotes(&self, channel_id: &ChannelId) {
        let (seven_tv, better_ttv, franker_face_z) = tokio::join!(
            self.inner.seven_tv.channel_emotes(channel_id),
            self.inner.better_ttv.channel_emotes(channel_id),
            self.inner.franker_face_z.channel_emotes(channel_id),
        );

        let mut merged = HashMap::new();
        merge_ranked(&mut merged, absorb(seven_tv, EmoteProvider::SevenTv));
        merge_ranked(&mut merged, absorb(better_ttv, EmoteProvider::BetterTtv));
        merge_ranked(
            &mut merged,
            absorb(franker_face_z, EmoteProvider::FrankerFaceZ),
        );

        tracing::debug!(channel = %channel_id, count = merged.len(), "channel emote catalog loaded");
        self.inner
            .catalogs
            .lock()
            .unwrap()
            .per_channel
            .insert(channel_id.clone(), merged);
    }

    /// Resolve an emote by exact name: global catalog first, then the
    /// channel's. A global entry always wins, regardless of source rank.
    pub fn emote(&self, name: &str, channel_id: &ChannelId) -> Option<Emote> {
        let catalogs = self.inner.catalogs.lock().unwrap();
        if let Some(emote) = catalogs.global.get(name) {
            return Some(emote.clone());
        }
        catalogs
            .per_channel
            .get(channel_id)
            .and_then(|channel| channel.get(name))
            .cloned()
    }

    pub fn global_emote_count(&self) -> usize {
        self.inner.catalogs.lock().unwrap().global.len()
    }

    pub fn channel_emote_count(&self, channel_id: &ChannelId) -> usize {
        self.inner
            .catalogs
            .lock()
            .unwrap()
            .per_channel
            .get(channel_id)
            .map_or(0, |channel| channel.len())
    }
}

fn absorb(result: Result<Vec<Emote>, CoreError>, provider: EmoteProvider) -> Vec<Emote> {
    match result {
        Ok(emotes) => emotes,
        Err(err) => {
            tracing::warn!(provider = %provider, error = %err, "emote provider fetch failed");
            Vec::new()
        }
    }
}

/// Merge emotes into a catalog under the rank rule: a candidate replaces
/// an incumbent of the same name only when its provider ranks strictly
/// higher.
fn merge_ranked(map: &mut EmoteMap, emotes: Vec<Emote>) {
    for emote in emotes {
        match map.entry(emote.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(emote);
            }
            Entry::Occupied(mut slot) => {
                if emote.source > slot.get().source {
                    slot.insert(emote);
                }
            }
        }
    }
}
