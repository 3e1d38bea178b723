//! Bounded scrollback for one chat session.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::models::ChatEntry;

/// Default eviction thresholds. Reaching `high_water` entries evicts the
/// oldest `low_water` entries in one batch; batching keeps front-removal
/// off the per-message hot path.
pub const DEFAULT_HIGH_WATER: usize = 400;
pub const DEFAULT_LOW_WATER: usize = 300;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Entry count that triggers eviction.
    pub high_water: usize,

    /// Number of oldest entries evicted per batch. At most `high_water`.
    pub low_water: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            high_water: DEFAULT_HIGH_WATER,
            low_water: DEFAULT_LOW_WATER,
        }
    }
}

/// Append-only entry log with batch eviction from the front.
///
/// Not thread-safe on its own; the owning session serializes access.
#[derive(Debug)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    high_water: usize,
    low_water: usize,
}

impl ChatLog {
    pub fn new(config: &ChatConfig) -> Self {
        ChatLog {
            entries: VecDeque::with_capacity(config.high_water),
            high_water: config.high_water,
            low_water: config.low_water.min(config.high_water),
        }
    }

    /// Append an entry, evicting a batch from the front if the high-water
    /// mark is reached. Returns the number of evicted entries, if any.
    pub fn push(&mut self, entry: ChatEntry) -> Option<usize> {
        self.entries.push_back(entry);
        if self.entries.len() >= self.high_water {
            let remove = self.low_water.min(self.entries.len());
            self.entries.drain(..remove);
            return Some(remove);
        }
        None
    }

    /// Append a disconnect divider, unless the log is empty or already ends
    /// with one. Returns whether a divider was appended.
    pub fn append_divider(&mut self, at: DateTime<Utc>) -> bool {
        match self.entries.back() {
            None => false,
            Some(last) if last.is_divider() => false,
            Some(_) => {
                self.entries.push_back(ChatEntry::Divider(at));
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }
}
