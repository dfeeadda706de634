//! GitHub App Authentication
//!
//! Mints short-lived installation access tokens for the approving GitHub App.
//! An RS256 JWT authenticates as the App, then is exchanged for an
//! installation token scoped to the repository's installation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::approver::TokenIssuer;
use crate::error::{ApproveError, Result};
use crate::review::{github_request, RepoSlug};

/// JWT claims for GitHub App authentication
#[derive(Debug, Serialize)]
pub struct GitHubAppClaims {
    /// Issued at time (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issuer (GitHub App ID)
    pub iss: String,
}

impl GitHubAppClaims {
    /// Claims valid for 10 minutes, backdated 60 seconds for clock skew
    pub fn new(app_id: &str, now: u64) -> Self {
        Self {
            iat: now.saturating_sub(60),
            exp: now + 600,
            iss: app_id.to_string(),
        }
    }
}

/// Generate a JWT for GitHub App authentication
///
/// # Arguments
/// * `app_id` - The GitHub App ID
/// * `private_key_pem` - The private key in PEM format
///
/// # Returns
/// A JWT string valid for 10 minutes
pub fn generate_jwt(app_id: &str, private_key_pem: &[u8]) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ApproveError::TokenIssuance(format!("Failed to get current time: {}", e)))?
        .as_secs();

    let claims = GitHubAppClaims::new(app_id, now);

    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
        .map_err(|e| ApproveError::TokenIssuance(format!("Failed to parse private key: {}", e)))?;

    let header = Header::new(Algorithm::RS256);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApproveError::TokenIssuance(format!("Failed to encode JWT: {}", e)))
}

/// Response from GitHub installation token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Installation {
    id: u64,
}

/// GitHub App credentials
#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub private_key_pem: Vec<u8>,
    /// Fixed installation; looked up per repository when unset
    pub installation_id: Option<u64>,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("private_key_pem", &"<redacted>")
            .field("installation_id", &self.installation_id)
            .finish()
    }
}

/// Issues installation tokens through the GitHub REST API
#[derive(Debug, Clone)]
pub struct AppTokenIssuer {
    http: reqwest::Client,
    api_url: String,
    credentials: AppCredentials,
}

impl AppTokenIssuer {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        credentials: AppCredentials,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Find the App installation covering `repo`
    async fn installation_id(&self, jwt: &str, repo: &RepoSlug) -> Result<u64> {
        if let Some(id) = self.credentials.installation_id {
            return Ok(id);
        }

        let url = format!("{}/repos/{}/{}/installation", self.api_url, repo.owner, repo.name);
        let response = github_request(self.http.get(&url), jwt)
            .send()
            .await
            .map_err(|e| {
                ApproveError::TokenIssuance(format!("Installation lookup failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApproveError::TokenIssuance(format!(
                "No installation for {} ({}): {}",
                repo, status, body
            )));
        }

        let installation: Installation = response.json().await.map_err(|e| {
            ApproveError::TokenIssuance(format!("Failed to parse installation response: {}", e))
        })?;
        Ok(installation.id)
    }

    /// Exchange an App JWT for an installation access token
    pub async fn installation_token(&self, repo: &RepoSlug) -> Result<InstallationToken> {
        let jwt = generate_jwt(&self.credentials.app_id, &self.credentials.private_key_pem)?;
        let installation_id = self.installation_id(&jwt, repo).await?;

        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, installation_id
        );
        let response = github_request(self.http.post(&url), &jwt)
            .send()
            .await
            .map_err(|e| {
                ApproveError::TokenIssuance(format!("Failed to send request to GitHub API: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApproveError::TokenIssuance(format!(
                "GitHub API error ({}): {}",
                status, body
            )));
        }

        let token: InstallationToken = response.json().await.map_err(|e| {
            ApproveError::TokenIssuance(format!(
                "Failed to parse installation token response: {}",
                e
            ))
        })?;

        info!(
            app_id = %self.credentials.app_id,
            installation_id,
            expires_at = %token.expires_at,
            "Issued installation token"
        );
        Ok(token)
    }
}

#[async_trait]
impl TokenIssuer for AppTokenIssuer {
    async fn issue(&self, repository: &str) -> Result<String> {
        let repo = RepoSlug::parse(repository)?;
        Ok(self.installation_token(&repo).await?.token)
    }
}
