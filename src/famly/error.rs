use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the Famly API
#[derive(Error, Debug)]
pub enum FamlyError {
    /// Credentials rejected, or the auth response carried no token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The access token was rejected (401)
    #[error("Access token rejected (401 Unauthorized)")]
    Unauthorized,

    /// No access token is held and none could be obtained
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Famly returned unexpected status {status} for {endpoint}")]
    Status { status: StatusCode, endpoint: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl FamlyError {
    /// True for errors that a fresh token could fix
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FamlyError::Unauthorized)
    }
}
