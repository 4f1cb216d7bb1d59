//! API client errors.

use thiserror::Error;

/// Errors raised while building or authenticating the API client.
///
/// Per-record submission outcomes are data in the batch report, not
/// errors; this type covers only the client setup path.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The token-refresh call failed at the transport level.
    #[error("token refresh failed: {0}")]
    Transport(String),

    /// The token-refresh call was rejected by the remote API.
    #[error("token refresh rejected with status {status}: {snippet}")]
    TokenRefreshRejected { status: u16, snippet: String },

    /// The token-refresh response carried no access token.
    #[error("token refresh response carried no access token")]
    MissingAccessToken,
}
