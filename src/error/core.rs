//! Unified error type for the runtime.
//!
//! `CoreError` consolidates the domain-specific error types so loaders and
//! callers can make handling decisions (retry, re-auth, ignore) without
//! matching on every leaf variant. Cancellation is modelled as an error
//! variant internally but is never surfaced to observers as a visible
//! error status; the loader filters it at the commit boundary.

use std::fmt;

use super::auth::AuthError;
use super::network::NetworkError;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, timeout, and HTTP transport failures. Generally retryable.
    Network,

    /// Credential rejections. Resolved by re-authenticating.
    Auth,

    /// Malformed or unexpected payloads, and missing resources. Not
    /// retryable until the upstream data changes.
    Data,

    /// Cooperative cancellation. Not an error from the user's perspective.
    Cancelled,
}

impl ErrorCategory {
    /// Short label for the category, suitable for logging fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Data => "data",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for the runtime.
///
/// Errors are `Clone` because they are carried inside [`LoadStatus::Error`]
/// values published through watch channels.
///
/// [`LoadStatus::Error`]: crate::loader::LoadStatus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Network-related errors (connections, HTTP, timeouts).
    Network(NetworkError),

    /// Authentication/authorization errors.
    Auth(AuthError),

    /// A provider or API returned a payload that failed to decode.
    Decode { context: String, message: String },

    /// An expected resource was absent from a response.
    NotFound { what: String },

    /// The operation was cancelled before completing.
    Cancelled,
}

impl CoreError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Network(_) => ErrorCategory::Network,
            CoreError::Auth(_) => ErrorCategory::Auth,
            CoreError::Decode { .. } => ErrorCategory::Data,
            CoreError::NotFound { .. } => ErrorCategory::Data,
            CoreError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Check if this error is transient enough that the caller may retry.
    ///
    /// The runtime itself never retries; this informs the retry affordance
    /// the owning application shows next to an error state.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Network(err) => err.is_retryable(),
            CoreError::Auth(_) => false,
            CoreError::Decode { .. } => false,
            CoreError::NotFound { .. } => false,
            CoreError::Cancelled => false,
        }
    }

    /// Check if this error should send the user back through login.
    pub fn requires_reauth(&self) -> bool {
        match self {
            CoreError::Auth(err) => err.requires_reauth(),
            CoreError::Network(NetworkError::HttpStatus { status: 401, .. }) => true,
            _ => false,
        }
    }

    /// Check if this error represents cooperative cancellation.
    ///
    /// Cancellation must never reach an observer as a visible error; every
    /// commit path checks this before publishing an `Error` status.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            CoreError::Cancelled | CoreError::Network(NetworkError::Cancelled)
        )
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Network(err) => err.user_message(),
            CoreError::Auth(err) => err.user_message(),
            CoreError::Decode { .. } => {
                "Received an invalid response from the server. Please try again.".to_string()
            }
            CoreError::NotFound { what } => format!("{} was not found.", what),
            CoreError::Cancelled => "The request was cancelled.".to_string(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Network(err) => err.error_code(),
            CoreError::Auth(err) => err.error_code(),
            CoreError::Decode { .. } => "E_DECODE",
            CoreError::NotFound { .. } => "E_NOT_FOUND",
            CoreError::Cancelled => "E_CANCELLED",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Network(err) => write!(f, "{}", err),
            CoreError::Auth(err) => write!(f, "{}", err),
            CoreError::Decode { context, message } => {
                write!(f, "Failed to decode {}: {}", context, message)
            }
            CoreError::NotFound { what } => write!(f, "{} not found", what),
            CoreError::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Network(err) => Some(err),
            CoreError::Auth(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for CoreError {
    fn from(err: NetworkError) -> Self {
        CoreError::Network(err)
    }
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        CoreError::Auth(err)
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        CoreError::Network(super::network::classify_reqwest_error(&err, &url))
    }
}

/// Result alias used throughout the runtime.
pub type CoreResult<T> = Result<T, CoreError>;
