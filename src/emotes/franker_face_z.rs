//! FrankerFaceZ emote provider client.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::seven_tv::http_error;
use crate::error::CoreError;
use crate::models::{ChannelId, Emote, EmoteProvider};

pub const FRANKER_FACE_Z_BASE_URL: &str = "https://api.frankerfacez.com";

/// Both the global and the room payload carry a `sets` table; emotes from
/// every listed set are active.
#[derive(Debug, Deserialize)]
struct SetsResponse {
    sets: HashMap<String, EmoteSet>,
}

#[derive(Debug, Deserialize)]
struct EmoteSet {
    #[serde(default)]
    emoticons: Vec<FfzEmote>,
}

#[derive(Debug, Deserialize)]
struct FfzEmote {
    id: u64,
    name: String,
    /// URLs keyed by scale ("1", "2", "4"). Older payloads carry
    /// protocol-relative URLs.
    #[serde(default)]
    urls: HashMap<String, String>,
    /// Non-null when an animated rendition exists.
    #[serde(default)]
    animated: Option<Value>,
}

impl FfzEmote {
    fn into_emote(self) -> Emote {
        let has_animated = matches!(&self.animated, Some(v) if !v.is_null());
        let image_url = if has_animated {
            format!(
                "https://cdn.frankerfacez.com/emote/{}/animated/1",
                self.id
            )
        } else {
            self.urls
                .get("1")
                .map(|url| normalize_url(url))
                .unwrap_or_else(|| {
                    format!("https://cdn.frankerfacez.com/emote/{}/1", self.id)
                })
        };
        Emote {
            image_url,
            name: self.name,
            source: EmoteProvider::FrankerFaceZ,
        }
    }
}

fn normalize_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    }
}

/// Client for the FrankerFaceZ REST API.
pub struct FrankerFaceZClient {
    pub base_url: String,
    client: Client,
}

impl FrankerFaceZClient {
    pub fn new() -> Self {
        Self::with_base_url(FRANKER_FACE_Z_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub async fn global_emotes(&self) -> Result<Vec<Emote>, CoreError> {
        let url = format!("{}/v1/set/global", self.base_url);
        self.fetch_sets(&url, "ffz global set").await
    }

    /// Fetch a channel's active sets. Rooms unknown to FFZ yield an empty
    /// set.
    pub async fn channel_emotes(&self, channel_id: &ChannelId) -> Result<Vec<Emote>, CoreError> {
        let url = format!("{}/v1/room/id/{}", self.base_url, channel_id);
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        Self::decode_sets(response, "ffz room").await
    }

    async fn fetch_sets(&self, url: &str, context: &str) -> Result<Vec<Emote>, CoreError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        Self::decode_sets(response, context).await
    }

    async fn decode_sets(
        response: reqwest::Response,
        context: &str,
    ) -> Result<Vec<Emote>, CoreError> {
        let sets: SetsResponse = response.json().await.map_err(|e| CoreError::Decode {
            context: context.to_string(),
            message: e.to_string(),
        })?;
        Ok(sets
            .sets
            .into_values()
            .flat_map(|set| set.emoticons)
            .map(FfzEmote::into_emote)
            .collect())
    }
}

impl Default for FrankerFaceZClient {
    fn default() -> Self {
        Self::new()
    }
}
