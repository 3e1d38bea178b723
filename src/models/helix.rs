//! Models for Twitch Helix REST payloads.
//!
//! Helix wraps every response in a `{ "data": [...], "pagination": {...} }`
//! envelope; the client unwraps it into [`Page`] values so callers never
//! see the envelope shape.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of results from a cursor-paginated endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Opaque cursor for the next page, absent on the last page.
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, cursor: Option<String>) -> Self {
        Page { items, cursor }
    }

    /// Append a follow-up page, adopting its cursor.
    pub fn extended(mut self, next: Page<T>) -> Page<T> {
        self.items.extend(next.items);
        self.cursor = next.cursor;
        self
    }

    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Page {
            items: Vec::new(),
            cursor: None,
        }
    }
}

/// A live stream as reported by `GET /streams` and `GET /streams/followed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamSummary {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
    pub title: String,
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
    pub language: String,
    /// Template URL containing `{width}x{height}` placeholders.
    pub thumbnail_url: String,
    #[serde(default)]
    pub is_mature: bool,
}

/// A user profile as reported by `GET /users`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
    pub created_at: DateTime<Utc>,
}

/// A followed channel as reported by `GET /channels/followed`.
///
/// Unlike `StreamSummary`, entries appear whether or not the channel is
/// currently live.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FollowedChannel {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
    pub broadcaster_name: String,
    pub followed_at: DateTime<Utc>,
}

/// A VOD as reported by `GET /videos`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    pub view_count: u64,
    /// Helix duration string, e.g. `3h8m33s`.
    pub duration: String,
}

/// A game/category hit from `GET /search/categories`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub box_art_url: String,
}

/// A channel hit from `GET /search/channels`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelSearchResult {
    pub id: String,
    pub broadcaster_login: String,
    pub display_name: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
    pub is_live: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
}
