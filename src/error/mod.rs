//! Error types for the runtime.
//!
//! Leaf error types live in their own modules (`network`, `auth`) and are
//! unified under [`CoreError`], which is what loaders publish and what the
//! public API returns. Keep leaf variants structured so callers can match
//! on them; stringly-typed errors end at the `Other`/`Decode` boundary.

mod auth;
mod core;
mod network;

pub use auth::AuthError;
pub use core::{CoreError, CoreResult, ErrorCategory};
pub use network::{classify_reqwest_error, NetworkError};
