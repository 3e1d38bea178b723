//! BetterTTV emote provider client.

use reqwest::Client;
use serde::Deserialize;

use super::seven_tv::http_error;
use crate::error::CoreError;
use crate::models::{ChannelId, Emote, EmoteProvider};

pub const BETTER_TTV_BASE_URL: &str = "https://api.betterttv.net";

#[derive(Debug, Deserialize)]
struct BttvEmote {
    id: String,
    /// BTTV calls the trigger word `code`.
    code: String,
}

impl BttvEmote {
    fn into_emote(self) -> Emote {
        Emote {
            image_url: format!("https://cdn.betterttv.net/emote/{}/1x", self.id),
            name: self.code,
            source: EmoteProvider::BetterTtv,
        }
    }
}

/// Channel payload: emotes uploaded by the channel plus emotes shared with
/// it. Both sets are active in chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BttvUserResponse {
    #[serde(default)]
    channel_emotes: Vec<BttvEmote>,
    #[serde(default)]
    shared_emotes: Vec<BttvEmote>,
}

/// Client for the BetterTTV cached REST API.
pub struct BetterTtvClient {
    pub base_url: String,
    client: Client,
}

impl BetterTtvClient {
    pub fn new() -> Self {
        Self::with_base_url(BETTER_TTV_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub async fn global_emotes(&self) -> Result<Vec<Emote>, CoreError> {
        let url = format!("{}/3/cached/emotes/global", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let emotes: Vec<BttvEmote> = response.json().await.map_err(|e| CoreError::Decode {
            context: "bttv global emotes".to_string(),
            message: e.to_string(),
        })?;
        Ok(emotes.into_iter().map(BttvEmote::into_emote).collect())
    }

    /// Fetch a channel's emotes. BTTV answers 404 for channels it has never
    /// seen; that is an empty set, not a failure.
    pub async fn channel_emotes(&self, channel_id: &ChannelId) -> Result<Vec<Emote>, CoreError> {
        let url = format!("{}/3/cached/users/twitch/{}", self.base_url, channel_id);
        let response = self.client.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let user: BttvUserResponse = response.json().await.map_err(|e| CoreError::Decode {
            context: "bttv channel emotes".to_string(),
            message: e.to_string(),
        })?;
        Ok(user
            .channel_emotes
            .into_iter()
            .chain(user.shared_emotes)
            .map(BttvEmote::into_emote)
            .collect())
    }
}

impl Default for BetterTtvClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emote_url_template() {
        let emote = BttvEmote {
            id: "54fa8f1401e468494b85b537".to_string(),
            code: "FeelsGoodMan".to_string(),
        }
        .into_emote();

        assert_eq!(
            emote.image_url,
            "https://cdn.betterttv.net/emote/54fa8f1401e468494b85b537/1x"
        );
        assert_eq!(emote.name, "FeelsGoodMan");
        assert_eq!(emote.source, EmoteProvider::BetterTtv);
    }

    #[test]
    fn test_global_payload_decodes() {
        let json = r#"[
            {"id": "1", "code": "EZ", "imageType": "png", "animated": false},
            {"id": "2", "code": "pepeD", "imageType": "gif", "animated": true}
        ]"#;
        let emotes: Vec<BttvEmote> = serde_json::from_str(json).expect("decode");
        assert_eq!(emotes.len(), 2);
        assert_eq!(emotes[0].code, "EZ");
    }

    #[test]
    fn test_user_payload_merges_channel_and_shared() {
        let json = r#"{
            "id": "abc",
            "channelEmotes": [{"id": "1", "code": "own", "imageType": "png"}],
            "sharedEmotes": [{"id": "2", "code": "shared", "imageType": "png"}]
        }"#;
        let user: BttvUserResponse = serde_json::from_str(json).expect("decode");
        assert_eq!(user.channel_emotes.len(), 1);
        assert_eq!(user.shared_emotes.len(), 1);
    }

    #[test]
    fn test_user_payload_tolerates_missing_sections() {
        let json = r#"{"id": "abc"}"#;
        let user: BttvUserResponse = serde_json::from_str(json).expect("decode");
        assert!(user.channel_emotes.is_empty());
        assert!(user.shared_emotes.is_empty());
    }
}
