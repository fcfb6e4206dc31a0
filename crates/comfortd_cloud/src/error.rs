use thiserror::Error;

/// Failure talking to the Comfort Cloud.
///
/// Every variant is transient from the daemon's point of view: the request can
/// be retried later, possibly after logging in again.
#[derive(Debug, Error)]
pub enum CloudError {
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Login rejected or token revoked.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A request was attempted before `login()` succeeded.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Non-success status from the API.
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl CloudError {
    /// Returns `true` if the session token is no longer usable and a fresh
    /// login is required.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::NotLoggedIn)
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
