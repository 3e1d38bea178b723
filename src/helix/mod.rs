//! Twitch Helix REST client.
//!
//! Thin, stateless wrapper over the Helix endpoints the runtime consumes.
//! Credentials are injected at construction; the client performs no token
//! acquisition and no retries. Every response envelope
//! `{ "data": [...], "pagination": { "cursor": ... } }` is unwrapped into
//! a [`Page`] so callers never see the wire shape.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{AuthError, CoreError, CoreResult, NetworkError};
use crate::models::helix::{
    CategoryResult, ChannelSearchResult, FollowedChannel, Page, StreamSummary, UserProfile,
    VideoSummary,
};
use crate::models::ChannelId;

pub const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Page size requested from cursor-paginated endpoints.
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    // Path-form default: the flag form would bound `T: Default` in the
    // derived impl, and the wire models deliberately have no `Default`.
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    cursor: Option<String>,
}

/// Client for the Twitch Helix API.
///
/// One instance per credential set; the registry of live sessions does not
/// depend on it, so swapping accounts means swapping clients.
pub struct HelixClient {
    pub base_url: String,
    client_id: String,
    token: String,
    client: Client,
}

impl HelixClient {
    /// Create a client against the production Helix endpoint.
    pub fn new(client_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(HELIX_BASE_URL.to_string(), client_id, token)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(
        base_url: String,
        client_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            client_id: client_id.into(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Streams that are currently live for the given logins. Offline
    /// channels are simply absent from the result.
    pub async fn get_streams(&self, user_logins: &[&str]) -> CoreResult<Vec<StreamSummary>> {
        let query: Vec<(&str, &str)> = user_logins
            .iter()
            .map(|login| ("user_login", *login))
            .collect();
        let page = self.get_page::<StreamSummary>("streams", &query).await?;
        Ok(page.items)
    }

    /// Profiles for the given logins and/or ids, in API order.
    pub async fn get_users(&self, logins: &[&str], ids: &[&str]) -> CoreResult<Vec<UserProfile>> {
        let mut query: Vec<(&str, &str)> =
            logins.iter().map(|login| ("login", *login)).collect();
        query.extend(ids.iter().map(|id| ("id", *id)));
        let page = self.get_page::<UserProfile>("users", &query).await?;
        Ok(page.items)
    }

    /// Live streams from channels the user follows.
    pub async fn get_followed_streams(
        &self,
        user_id: &ChannelId,
        cursor: Option<&str>,
    ) -> CoreResult<Page<StreamSummary>> {
        let mut query = vec![("user_id", user_id.as_str()), ("first", PAGE_SIZE)];
        if let Some(cursor) = cursor {
            query.push(("after", cursor));
        }
        self.get_page("streams/followed", &query).await
    }

    /// Channels the user follows, live or not.
    pub async fn get_followed_channels(
        &self,
        user_id: &ChannelId,
        cursor: Option<&str>,
    ) -> CoreResult<Page<FollowedChannel>> {
        let mut query = vec![("user_id", user_id.as_str()), ("first", PAGE_SIZE)];
        if let Some(cursor) = cursor {
            query.push(("after", cursor));
        }
        self.get_page("channels/followed", &query).await
    }

    /// Archived videos for a channel, newest first.
    pub async fn get_videos(
        &self,
        user_id: &ChannelId,
        cursor: Option<&str>,
    ) -> CoreResult<Page<VideoSummary>> {
        let mut query = vec![("user_id", user_id.as_str()), ("first", PAGE_SIZE)];
        if let Some(cursor) = cursor {
            query.push(("after", cursor));
        }
        self.get_page("videos", &query).await
    }

    /// Categories matching a search query.
    pub async fn search_categories(&self, query: &str) -> CoreResult<Page<CategoryResult>> {
        self.get_page("search/categories", &[("query", query)])
            .await
    }

    /// Channels matching a search query, optionally restricted to live ones.
    pub async fn search_channels(
        &self,
        query: &str,
        live_only: bool,
    ) -> CoreResult<Page<ChannelSearchResult>> {
        let live = if live_only { "true" } else { "false" };
        self.get_page("search/channels", &[("query", query), ("live_only", live)])
            .await
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> CoreResult<Page<T>> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Client-Id", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status {
                401 | 403 => CoreError::Auth(AuthError::from_status(status, message)),
                404 => CoreError::NotFound {
                    what: format!("helix resource {}", path),
                },
                _ => CoreError::Network(NetworkError::HttpStatus { status, message }),
            });
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| CoreError::Decode {
            context: format!("helix {}", path),
            message: e.to_string(),
        })?;
        Ok(Page::new(envelope.data, envelope.pagination.cursor))
    }
}
