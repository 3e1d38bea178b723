//! Authentication-related error types.
//!
//! The runtime never acquires tokens itself; it only needs to recognize
//! when the platform API rejects the credentials it was handed, so the
//! owning application can trigger re-authentication.

use std::fmt;

/// Authorization failures reported by the platform API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The access token was rejected outright (HTTP 401).
    Unauthorized { message: String },

    /// The token is valid but lacks permission for the resource (HTTP 403).
    Forbidden { message: String },
}

impl AuthError {
    /// Build the variant matching an HTTP status code.
    ///
    /// Only call this for 401/403 responses; other statuses belong to
    /// [`NetworkError`](super::NetworkError).
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 403 {
            AuthError::Forbidden { message }
        } else {
            AuthError::Unauthorized { message }
        }
    }

    /// Check if this error might be resolved by re-authenticating.
    ///
    /// Both variants trigger the re-auth path: a 403 from the platform
    /// almost always means the stored token was issued without a scope
    /// the app now needs, which a fresh login fixes.
    pub fn requires_reauth(&self) -> bool {
        true
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Unauthorized { .. } => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::Forbidden { .. } => {
                "Access denied. Please sign in again to grant the necessary permissions."
                    .to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthorized { .. } => "E_AUTH_UNAUTHORIZED",
            AuthError::Forbidden { .. } => "E_AUTH_FORBIDDEN",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unauthorized { message } => {
                write!(f, "Unauthorized: {}", message)
            }
            AuthError::Forbidden { message } => {
                write!(f, "Forbidden: {}", message)
            }
        }
    }
}

impl std::error::Error for AuthError {}
