//! Lantern - a headless client runtime for livestream platforms
//!
//! This library exposes modules for use in integration tests and host
//! applications.

pub mod adapters;
pub mod chat;
pub mod emotes;
pub mod error;
pub mod helix;
pub mod irc;
pub mod loader;
pub mod models;
pub mod presence;
pub mod runtime;
pub mod traits;
