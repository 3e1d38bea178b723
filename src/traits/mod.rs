//! Trait abstractions for dependency injection and testability.
//!
//! The chat transport is the runtime's only seam to the network push path;
//! abstracting it lets integration tests drive sessions with scripted
//! events instead of a live IRC connection.
//!
//! # Traits
//!
//! - [`ChatTransport`] - establishing chat connections
//! - [`ChatSink`] - channel membership and teardown on a live connection

pub mod chat;

pub use chat::{ChatConnection, ChatError, ChatSink, ChatTransport, TransportEvent};
