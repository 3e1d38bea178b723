//! Two-pass message chunking.
//!
//! Pass one cuts the message around platform-native emote spans; pass two
//! rescans the remaining text chunks word by word against the third-party
//! emote lookup. Output chunks read strictly left to right through the
//! original message, with inter-word whitespace preserved.

use uuid::Uuid;

use crate::models::{ChatMessage, Emote, EmoteSpan, InboundMessage, MessageChunk};

/// CDN template for platform-native emotes, keyed by emote id.
pub fn native_emote_url(emote_id: &str) -> String {
    format!(
        "https://static-cdn.jtvnw.net/emoticons/v2/{}/default/dark/1.0",
        emote_id
    )
}

/// Split a message into display chunks.
///
/// `spans` carry inclusive code point offsets and need not arrive sorted;
/// out-of-range offsets are clamped and overlapping or inverted spans are
/// dropped rather than failing the message. `lookup` resolves a candidate
/// word to a third-party emote; matching is exact and case-sensitive.
pub fn chunk_message<F>(text: &str, spans: &[EmoteSpan], lookup: F) -> Vec<MessageChunk>
where
    F: Fn(&str) -> Option<Emote>,
{
    let chars: Vec<char> = text.chars().collect();

    let mut sorted: Vec<&EmoteSpan> = spans.iter().collect();
    sorted.sort_by_key(|span| span.start);

    // Pass one: split around native emote spans.
    let mut first_pass = Vec::new();
    let mut cursor = 0usize;
    for span in sorted {
        let start = span.start.min(chars.len());
        // Spans are inclusive; convert to an exclusive end, clamped.
        let end = span.end.saturating_add(1).min(chars.len());
        if start >= end || start < cursor {
            continue;
        }
        if start > cursor {
            first_pass.push(MessageChunk::Text(chars[cursor..start].iter().collect()));
        }
        first_pass.push(MessageChunk::Image(native_emote_url(&span.emote_id)));
        cursor = end;
    }
    if cursor < chars.len() {
        first_pass.push(MessageChunk::Text(chars[cursor..].iter().collect()));
    }

    // Pass two: word-level third-party substitution inside text chunks.
    let mut chunks = Vec::with_capacity(first_pass.len());
    for chunk in first_pass {
        match chunk {
            MessageChunk::Image(url) => chunks.push(MessageChunk::Image(url)),
            MessageChunk::Text(text) => substitute_words(&text, &lookup, &mut chunks),
        }
    }
    chunks
}

/// Rescan one text chunk, replacing whole words that resolve to emotes.
/// Non-matching words re-coalesce with their surrounding whitespace.
fn substitute_words<F>(text: &str, lookup: &F, out: &mut Vec<MessageChunk>)
where
    F: Fn(&str) -> Option<Emote>,
{
    let mut pending = String::new();
    let mut word = String::new();

    let flush_word = |pending: &mut String, word: &mut String, out: &mut Vec<MessageChunk>| {
        if word.is_empty() {
            return;
        }
        match lookup(word) {
            Some(emote) => {
                if !pending.is_empty() {
                    out.push(MessageChunk::Text(std::mem::take(pending)));
                }
                out.push(MessageChunk::Image(emote.image_url));
                word.clear();
            }
            None => {
                pending.push_str(word);
                word.clear();
            }
        }
    };

    for c in text.chars() {
        if c.is_whitespace() {
            flush_word(&mut pending, &mut word, out);
            pending.push(c);
        } else {
            word.push(c);
        }
    }
    flush_word(&mut pending, &mut word, out);

    if !pending.is_empty() {
        out.push(MessageChunk::Text(pending));
    }
}

/// Derive a display-ready [`ChatMessage`] from an inbound message.
///
/// Chunking happens once here; the resulting message is immutable.
pub fn build_message<F>(inbound: InboundMessage, lookup: F) -> ChatMessage
where
    F: Fn(&str) -> Option<Emote>,
{
    let chunks = chunk_message(&inbound.text, &inbound.emote_spans, lookup);
    let emote_urls = chunks
        .iter()
        .filter_map(|chunk| match chunk {
            MessageChunk::Image(url) => Some(url.clone()),
            MessageChunk::Text(_) => None,
        })
        .collect();

    let InboundMessage {
        sender_login,
        display_name,
        color,
        text,
        sent_at,
        ..
    } = inbound;

    ChatMessage {
        id: Uuid::new_v4(),
        author: display_name.unwrap_or(sender_login),
        color,
        text,
        chunks,
        emote_urls,
        sent_at,
    }
}
