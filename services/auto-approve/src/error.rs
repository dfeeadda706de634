//! Error types for the auto-approve pipeline

use thiserror::Error;

use crate::policy::CredentialScope;

/// Errors that can occur while handling a pull request event
#[derive(Debug, Error)]
pub enum ApproveError {
    /// The event payload is malformed or lacks a required field
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Repository name is not in `owner/repo` form
    #[error("Invalid repository format: {0}. Expected: owner/repo")]
    InvalidRepository(String),

    /// Minting the GitHub App installation token failed
    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    /// The decision requires a credential that is not configured
    #[error("No credential configured for scope {0}")]
    MissingCredential(CredentialScope),

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ApproveError {
    fn from(err: serde_json::Error) -> Self {
        ApproveError::InvalidEvent(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApproveError>;
