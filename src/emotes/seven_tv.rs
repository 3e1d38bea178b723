//! 7TV emote provider client.

use reqwest::Client;
use serde::Deserialize;

use crate::error::CoreError;
use crate::models::{ChannelId, Emote, EmoteProvider};

pub const SEVEN_TV_BASE_URL: &str = "https://7tv.io";

#[derive(Debug, Deserialize)]
struct EmoteSetResponse {
    #[serde(default)]
    emotes: Vec<SevenTvEmote>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    emote_set: Option<EmoteSetResponse>,
}

#[derive(Debug, Deserialize)]
struct SevenTvEmote {
    id: String,
    name: String,
    #[serde(default)]
    data: SevenTvEmoteData,
}

#[derive(Debug, Default, Deserialize)]
struct SevenTvEmoteData {
    #[serde(default)]
    animated: bool,
}

impl SevenTvEmote {
    fn into_emote(self) -> Emote {
        let extension = if self.data.animated { "gif" } else { "webp" };
        Emote {
            image_url: format!("https://cdn.7tv.app/emote/{}/1x.{}", self.id, extension),
            name: self.name,
            source: EmoteProvider::SevenTv,
        }
    }
}

/// Client for the 7TV REST API.
pub struct SevenTvClient {
    pub base_url: String,
    client: Client,
}

impl SevenTvClient {
    pub fn new() -> Self {
        Self::with_base_url(SEVEN_TV_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// Fetch the global emote set.
    pub async fn global_emotes(&self) -> Result<Vec<Emote>, CoreError> {
        let url = format!("{}/v3/emote-sets/global", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let set: EmoteSetResponse = response.json().await.map_err(|e| CoreError::Decode {
            context: "7tv global emote set".to_string(),
            message: e.to_string(),
        })?;
        Ok(set.emotes.into_iter().map(SevenTvEmote::into_emote).collect())
    }

    /// Fetch the emote set a channel has activated. Channels unknown to
    /// 7TV yield an empty set.
    pub async fn channel_emotes(&self, channel_id: &ChannelId) -> Result<Vec<Emote>, CoreError> {
        let url = format!("{}/v3/users/twitch/{}", self.base_url, channel_id);
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let user: UserResponse = response.json().await.map_err(|e| CoreError::Decode {
            context: "7tv channel emote set".to_string(),
            message: e.to_string(),
        })?;
        Ok(user
            .emote_set
            .map(|set| set.emotes.into_iter().map(SevenTvEmote::into_emote).collect())
            .unwrap_or_default())
    }
}

impl Default for SevenTvClient {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) async fn http_error(response: reqwest::Response) -> CoreError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    CoreError::Network(crate::error::NetworkError::HttpStatus { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animated_emote_uses_gif_url() {
        let emote = SevenTvEmote {
            id: "60ae958e229664e8667aea38".to_string(),
            name: "catJAM".to_string(),
            data: SevenTvEmoteData { animated: true },
        }
        .into_emote();

        assert_eq!(
            emote.image_url,
            "https://cdn.7tv.app/emote/60ae958e229664e8667aea38/1x.gif"
        );
        assert_eq!(emote.source, EmoteProvider::SevenTv);
    }

    #[test]
    fn test_static_emote_uses_webp_url() {
        let emote = SevenTvEmote {
            id: "abc".to_string(),
            name: "Still".to_string(),
            data: SevenTvEmoteData { animated: false },
        }
        .into_emote();

        assert_eq!(emote.image_url, "https://cdn.7tv.app/emote/abc/1x.webp");
    }

    #[test]
    fn test_emote_set_payload_decodes() {
        let json = r#"{
            "id": "global",
            "name": "Global Set",
            "emotes": [
                {"id": "1", "name": "EZ", "data": {"animated": false}},
                {"id": "2", "name": "catJAM", "data": {"animated": true}}
            ]
        }"#;
        let set: EmoteSetResponse = serde_json::from_str(json).expect("decode");
        assert_eq!(set.emotes.len(), 2);
        assert_eq!(set.emotes[1].name, "catJAM");
        assert!(set.emotes[1].data.animated);
    }

    #[test]
    fn test_user_payload_tolerates_missing_emote_set() {
        let json = r#"{"id": "u1", "username": "someone"}"#;
        let user: UserResponse = serde_json::from_str(json).expect("decode");
        assert!(user.emote_set.is_none());
    }

    #[test]
    fn test_emote_tolerates_missing_data() {
        let json = r#"{"id": "3", "name": "NoData"}"#;
        let emote: SevenTvEmote = serde_json::from_str(json).expect("decode");
        assert!(!emote.data.animated);
    }
}
