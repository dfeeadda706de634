//! Approval Pipeline
//!
//! Runs one pull request event through the trigger gate and the approval
//! policy, resolves the chosen credential and submits the review.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ApproveError, Result};
use crate::event::PullRequestEvent;
use crate::policy::{ApprovalDecision, ApprovalPolicy, CredentialScope};
use crate::review::ApprovalResult;

pub const DEFAULT_REVIEW_MESSAGE: &str = "Auto-approved: PR carries the auto-approve label.";

/// Source of short-lived GitHub App tokens
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint a token able to review PRs in `repository` (`owner/repo`)
    async fn issue(&self, repository: &str) -> Result<String>;
}

/// Submits approving reviews
#[async_trait]
pub trait ReviewSubmitter: Send + Sync {
    async fn submit_approval(
        &self,
        token: &str,
        repository: &str,
        pr_number: u64,
        message: &str,
    ) -> Result<ApprovalResult>;
}

/// Why an event was not evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Action is not opened, labeled, ready_for_review or reopened
    NotTriggering,
    Draft,
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Skipped { reason: SkipReason },
    Declined { decision: ApprovalDecision },
    Approved {
        decision: ApprovalDecision,
        result: ApprovalResult,
    },
}

/// Approval pipeline
pub struct AutoApprover {
    policy: ApprovalPolicy,
    issuer: Option<Arc<dyn TokenIssuer>>,
    reviews: Arc<dyn ReviewSubmitter>,
    /// Ambient workflow token (`GITHUB_TOKEN`)
    workflow_token: Option<String>,
    message: String,
}

impl AutoApprover {
    pub fn new(policy: ApprovalPolicy, reviews: Arc<dyn ReviewSubmitter>) -> Self {
        Self {
            policy,
            issuer: None,
            reviews,
            workflow_token: None,
            message: DEFAULT_REVIEW_MESSAGE.to_string(),
        }
    }

    /// Set the App token issuer used for [`CredentialScope::BotAppToken`]
    pub fn with_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Set the ambient token used for [`CredentialScope::DefaultWorkflowToken`]
    pub fn with_workflow_token(mut self, token: impl Into<String>) -> Self {
        self.workflow_token = Some(token.into());
        self
    }

    /// Set the review body
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    /// Gate, evaluate and, when approved, submit the review.
    ///
    /// # Errors
    /// Fails when the required credential is unavailable or token issuance
    /// fails. A review rejected by GitHub is not an error; it is reported in
    /// the [`ApprovalResult`].
    pub async fn handle(&self, event: &PullRequestEvent) -> Result<Outcome> {
        if !event.is_triggering() {
            let reason = if event.is_draft {
                SkipReason::Draft
            } else {
                SkipReason::NotTriggering
            };
            return Ok(Outcome::Skipped { reason });
        }

        let decision = self.policy.evaluate(event);
        if !decision.should_approve() {
            info!(
                pr_number = event.number,
                repo = %event.repository,
                author = %event.author_login,
                "PR not eligible for auto-approval"
            );
            return Ok(Outcome::Declined { decision });
        }

        let token = self.credential(decision.credential_scope(), event).await?;
        info!(
            pr_number = event.number,
            repo = %event.repository,
            author = %event.author_login,
            head_ref = event.head_ref.as_deref().unwrap_or(""),
            credential = %decision.credential_scope(),
            "Approving PR"
        );

        let result = self
            .reviews
            .submit_approval(&token, &event.repository, event.number, &self.message)
            .await?;

        if !result.success {
            warn!(
                pr_number = event.number,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Approval was not accepted"
            );
        }

        Ok(Outcome::Approved { decision, result })
    }

    async fn credential(&self, scope: CredentialScope, event: &PullRequestEvent) -> Result<String> {
        match scope {
            CredentialScope::BotAppToken => {
                let issuer = self
                    .issuer
                    .as_ref()
                    .ok_or(ApproveError::MissingCredential(scope))?;
                issuer.issue(&event.repository).await
            }
            CredentialScope::DefaultWorkflowToken => self
                .workflow_token
                .clone()
                .ok_or(ApproveError::MissingCredential(scope)),
            CredentialScope::None => Err(ApproveError::MissingCredential(scope)),
        }
    }
}
