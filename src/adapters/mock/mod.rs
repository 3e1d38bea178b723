//! Mock implementations for testing.
//!
//! Test doubles for the transport abstractions, enabling session and
//! registry tests without network access.

pub mod chat;

pub use chat::{MockChatTransport, SinkCall};
