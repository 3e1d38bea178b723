//! Core domain models shared across the runtime.
//!
//! Chat and emote types live here; Helix REST payloads live in [`helix`].

pub mod helix;

pub use helix::{
    CategoryResult, ChannelSearchResult, FollowedChannel, Page, StreamSummary, UserProfile,
    VideoSummary,
};

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Twitch numeric user/channel identifier, carried as a string.
///
/// Twitch IDs are decimal strings in every API surface; keeping the string
/// avoids round-trip surprises with IDs above 2^53 in JSON contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        ChannelId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        ChannelId(id)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        ChannelId(id.to_string())
    }
}

/// A channel reference carrying both the numeric id and the IRC login name.
///
/// The id addresses REST endpoints (Helix, third-party emote providers);
/// the login addresses IRC JOIN/PART. Both are needed to run a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    pub id: ChannelId,
    pub login: String,
}

impl ChannelHandle {
    pub fn new(id: impl Into<ChannelId>, login: impl Into<String>) -> Self {
        ChannelHandle {
            id: id.into(),
            login: login.into(),
        }
    }
}

/// Identity context under which data was loaded.
///
/// Loaders compare the current epoch against the one captured at fetch time;
/// a mismatch invalidates cached data and triggers a refetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEpoch {
    /// No credentials; anonymous reads only.
    Anonymous,

    /// Logged in as a specific user.
    User { user_id: ChannelId },
}

impl AuthEpoch {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthEpoch::Anonymous)
    }
}

impl Default for AuthEpoch {
    fn default() -> Self {
        AuthEpoch::Anonymous
    }
}

/// Where an emote definition came from.
///
/// Variant order is the merge precedence, lowest first: when two providers
/// define the same emote name, the higher variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmoteProvider {
    FrankerFaceZ,
    BetterTtv,
    SevenTv,
}

impl EmoteProvider {
    /// Short label for logging fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmoteProvider::FrankerFaceZ => "ffz",
            EmoteProvider::BetterTtv => "bttv",
            EmoteProvider::SevenTv => "7tv",
        }
    }
}

impl fmt::Display for EmoteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named emote resolved to an image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emote {
    /// The word that triggers the emote in chat text.
    pub name: String,

    /// Fully-qualified CDN URL for the 1x rendition.
    pub image_url: String,

    pub source: EmoteProvider,
}

impl Emote {
    pub fn new(
        name: impl Into<String>,
        image_url: impl Into<String>,
        source: EmoteProvider,
    ) -> Self {
        Emote {
            name: name.into(),
            image_url: image_url.into(),
            source,
        }
    }
}

/// A native (Twitch-hosted) emote occurrence inside a message.
///
/// Offsets are inclusive Unicode code point indices into the message text,
/// exactly as carried by the IRC `emotes` tag. `end` points at the last
/// code point of the emote word, not one past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmoteSpan {
    pub emote_id: String,
    pub start: usize,
    pub end: usize,
}

/// A chat message as it arrives off the wire, before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_login: String,
    pub sender_login: String,
    pub display_name: Option<String>,
    /// Hex color the sender chose, e.g. `#FF4500`. Absent for users who
    /// never picked one.
    pub color: Option<String>,
    pub text: String,
    pub emote_spans: Vec<EmoteSpan>,
    pub sent_at: DateTime<Utc>,
}

/// One renderable piece of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageChunk {
    /// Literal text, whitespace preserved.
    Text(String),

    /// An inline image identified by its CDN URL.
    Image(String),
}

impl MessageChunk {
    pub fn is_image(&self) -> bool {
        matches!(self, MessageChunk::Image(_))
    }
}

/// A fully processed chat message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,

    /// Display name if the sender set one, otherwise the login.
    pub author: String,

    pub color: Option<String>,

    /// Original text, unmodified.
    pub text: String,

    /// Display chunks in reading order.
    pub chunks: Vec<MessageChunk>,

    /// URLs of every image chunk, in order. Convenient for prefetching.
    pub emote_urls: Vec<String>,

    pub sent_at: DateTime<Utc>,
}

/// One entry in a channel's scrollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEntry {
    Message(ChatMessage),

    /// Marks the point where the session disconnected; messages below a
    /// divider may be separated from those above by an offline gap.
    Divider(DateTime<Utc>),
}

impl ChatEntry {
    pub fn is_divider(&self) -> bool {
        matches!(self, ChatEntry::Divider(_))
    }

    pub fn as_message(&self) -> Option<&ChatMessage> {
        match self {
            ChatEntry::Message(msg) => Some(msg),
            ChatEntry::Divider(_) => None,
        }
    }
}

/// Lookup table from emote name to definition. Insertion is governed by
/// provider precedence; see [`EmoteProvider`].
pub type EmoteMap = HashMap<String, Emote>;
