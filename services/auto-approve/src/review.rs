//! Pull Request Reviews
//!
//! Submits approving reviews through the GitHub REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::approver::ReviewSubmitter;
use crate::error::{ApproveError, Result};

const USER_AGENT: &str = "auto-approve-bot";

/// Attach the headers every GitHub REST call carries
pub(crate) fn github_request(
    builder: reqwest::RequestBuilder,
    token: &str,
) -> reqwest::RequestBuilder {
    builder
        .bearer_auth(token)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", USER_AGENT)
        .header("X-GitHub-Api-Version", "2022-11-28")
}

/// Repository in `owner/repo` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn parse(full_name: &str) -> Result<Self> {
        match full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ApproveError::InvalidRepository(full_name.to_string())),
        }
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Result of a PR approval operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalResult {
    /// PR number
    pub pr_number: u64,
    /// Whether the approval succeeded
    pub success: bool,
    /// Review ID if successful
    pub review_id: Option<u64>,
    /// Error message if failed
    pub error: Option<String>,
}

impl ApprovalResult {
    /// Create a successful approval result
    pub fn success(pr_number: u64, review_id: u64) -> Self {
        Self {
            pr_number,
            success: true,
            review_id: Some(review_id),
            error: None,
        }
    }

    /// Create a failed approval result
    pub fn failure(pr_number: u64, error: impl Into<String>) -> Self {
        Self {
            pr_number,
            success: false,
            review_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Review {
    id: u64,
}

#[derive(Debug, Serialize)]
struct ReviewRequest<'a> {
    event: &'static str,
    body: &'a str,
}

/// Classify a rejected review submission
fn rejection_message(status: reqwest::StatusCode, body: &str) -> String {
    if body.contains("Can not approve your own pull request") {
        "Self-approval restriction".to_string()
    } else {
        format!("API error ({}): {}", status, body)
    }
}

/// GitHub review API client
#[derive(Debug, Clone)]
pub struct ReviewClient {
    http: reqwest::Client,
    api_url: String,
}

impl ReviewClient {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Submit an `APPROVE` review on `repo#pr_number`.
    ///
    /// Failures are reported in the returned [`ApprovalResult`].
    pub async fn approve(
        &self,
        token: &str,
        repo: &RepoSlug,
        pr_number: u64,
        message: &str,
    ) -> ApprovalResult {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.api_url, repo.owner, repo.name, pr_number
        );

        let request_body = ReviewRequest {
            event: "APPROVE",
            body: message,
        };

        let response = match github_request(self.http.post(&url), token)
            .json(&request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(pr_number, repo = %repo, error = %e, "Review request failed");
                return ApprovalResult::failure(pr_number, format!("Request failed: {}", e));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = rejection_message(status, &body);
            warn!(pr_number, repo = %repo, %status, error = %error, "Review rejected");
            return ApprovalResult::failure(pr_number, error);
        }

        match response.json::<Review>().await {
            Ok(review) => {
                info!(pr_number, repo = %repo, review_id = review.id, "PR approved");
                ApprovalResult::success(pr_number, review.id)
            }
            Err(e) => ApprovalResult::failure(
                pr_number,
                format!("Failed to parse review response: {}", e),
            ),
        }
    }
}

#[async_trait]
impl ReviewSubmitter for ReviewClient {
    async fn submit_approval(
        &self,
        token: &str,
        repository: &str,
        pr_number: u64,
        message: &str,
    ) -> Result<ApprovalResult> {
        let repo = RepoSlug::parse(repository)?;
        Ok(self.approve(token, &repo, pr_number, message).await)
    }
}
