//! Chat pipeline: transport events in, renderable log entries out.
//!
//! [`ChatRegistry`] owns one [`ChatSession`] per channel and drives its
//! lifecycle from presenter visibility. Each session resolves emotes,
//! chunks incoming messages, and appends them to a bounded [`ChatLog`].

mod chunker;
mod log;
mod registry;
mod session;

pub use chunker::{build_message, chunk_message, native_emote_url};
pub use log::{ChatConfig, ChatLog, DEFAULT_HIGH_WATER, DEFAULT_LOW_WATER};
pub use registry::ChatRegistry;
pub use session::{ChatEvent, ChatSession};
