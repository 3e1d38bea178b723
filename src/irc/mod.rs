//! Minimal IRC parsing for the Twitch chat dialect.
//!
//! Twitch speaks IRC over WebSocket with IRCv3 message tags enabled. This
//! module turns raw lines into structured [`IrcLine`] values and extracts
//! [`InboundMessage`]s from PRIVMSG lines. Parsing is tolerant: unknown
//! tags are kept as strings, malformed emote ranges are skipped, and only
//! structurally broken lines produce errors.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::models::{EmoteSpan, InboundMessage};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IrcParseError {
    #[error("empty line")]
    Empty,

    #[error("line has no command: {0}")]
    MissingCommand(String),

    #[error("PRIVMSG missing {0}")]
    MissingField(&'static str),
}

/// A parsed IRC line: tags, optional prefix, command, and parameters.
///
/// The trailing parameter (after ` :`) is the last element of `params`
/// with the colon stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcLine {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcLine {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|s| s.as_str())
    }

    /// Nickname portion of the prefix (`nick!user@host`), if present.
    pub fn sender_nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }
}

/// Parse one raw IRC line (without the trailing CRLF).
pub fn parse_line(line: &str) -> Result<IrcLine, IrcParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(IrcParseError::Empty);
    }

    let mut rest = line;

    let tags = if let Some(tagged) = rest.strip_prefix('@') {
        let (raw_tags, after) = tagged
            .split_once(' ')
            .ok_or_else(|| IrcParseError::MissingCommand(line.to_string()))?;
        rest = after;
        parse_tags(raw_tags)
    } else {
        HashMap::new()
    };

    let prefix = if let Some(prefixed) = rest.strip_prefix(':') {
        let (prefix, after) = prefixed
            .split_once(' ')
            .ok_or_else(|| IrcParseError::MissingCommand(line.to_string()))?;
        rest = after;
        Some(prefix.to_string())
    } else {
        None
    };

    let mut params = Vec::new();
    let command = match rest.split_once(' ') {
        Some((command, after)) => {
            let mut remainder = after;
            loop {
                if let Some(trailing) = remainder.strip_prefix(':') {
                    params.push(trailing.to_string());
                    break;
                }
                match remainder.split_once(' ') {
                    Some((param, after)) => {
                        if !param.is_empty() {
                            params.push(param.to_string());
                        }
                        remainder = after;
                    }
                    None => {
                        if !remainder.is_empty() {
                            params.push(remainder.to_string());
                        }
                        break;
                    }
                }
            }
            command
        }
        None => rest,
    };

    if command.is_empty() {
        return Err(IrcParseError::MissingCommand(line.to_string()));
    }

    Ok(IrcLine {
        tags,
        prefix,
        command: command.to_string(),
        params,
    })
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for pair in raw.split(';') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) => tags.insert(key.to_string(), unescape_tag_value(value)),
            None => tags.insert(pair.to_string(), String::new()),
        };
    }
    tags
}

/// Undo IRCv3 tag value escaping.
///
/// `\:` is `;`, `\s` is a space, `\\` is a backslash, `\r`/`\n` are CR/LF.
/// A lone trailing backslash is dropped; an unknown escape yields the
/// escaped character literally, both per the IRCv3 errata.
fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Parse the Twitch `emotes` tag value into spans.
///
/// Format: `id:start-end,start-end/id2:start-end`. Offsets are inclusive
/// Unicode code point indices. Malformed fragments and inverted ranges are
/// skipped rather than failing the whole message.
pub fn parse_emote_spans(tag_value: &str) -> Vec<EmoteSpan> {
    let mut spans = Vec::new();
    for group in tag_value.split('/') {
        let Some((emote_id, ranges)) = group.split_once(':') else {
            continue;
        };
        if emote_id.is_empty() {
            continue;
        }
        for range in ranges.split(',') {
            let Some((start, end)) = range.split_once('-') else {
                continue;
            };
            let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) else {
                continue;
            };
            if end < start {
                continue;
            }
            spans.push(EmoteSpan {
                emote_id: emote_id.to_string(),
                start,
                end,
            });
        }
    }
    spans
}

/// Extract an [`InboundMessage`] from a parsed PRIVMSG line.
pub fn inbound_from_privmsg(line: &IrcLine) -> Result<InboundMessage, IrcParseError> {
    debug_assert_eq!(line.command, "PRIVMSG");

    let channel_login = line
        .params
        .first()
        .map(|target| target.trim_start_matches('#').to_string())
        .filter(|target| !target.is_empty())
        .ok_or(IrcParseError::MissingField("channel target"))?;

    let sender_login = line
        .sender_nick()
        .map(str::to_string)
        .ok_or(IrcParseError::MissingField("sender prefix"))?;

    let text = line
        .params
        .get(1)
        .cloned()
        .ok_or(IrcParseError::MissingField("message text"))?;

    let display_name = line
        .tag("display-name")
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let color = line
        .tag("color")
        .filter(|color| !color.is_empty())
        .map(str::to_string);

    let emote_spans = line.tag("emotes").map(parse_emote_spans).unwrap_or_default();

    let sent_at = line
        .tag("tmi-sent-ts")
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(millis_to_datetime)
        .unwrap_or_else(Utc::now);

    Ok(InboundMessage {
        channel_login,
        sender_login,
        display_name,
        color,
        text,
        emote_spans,
        sent_at,
    })
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
