//! Concrete implementations of trait abstractions.
//!
//! Production adapters implement the traits in `crate::traits` so the
//! runtime can be wired against real infrastructure, while the [`mock`]
//! submodule provides scriptable doubles for tests.
//!
//! # Adapters
//!
//! - [`IrcWsTransport`] - Twitch IRC chat over tokio-tungstenite
//! - [`mock::MockChatTransport`] - Scripted transport with recorded sink calls

pub mod irc_ws;
pub mod mock;

pub use irc_ws::{IrcLogin, IrcWsTransport};
pub use mock::{MockChatTransport, SinkCall};
