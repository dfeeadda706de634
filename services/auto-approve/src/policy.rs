//! Approval Policy
//!
//! Decides whether a labeled pull request is approved automatically and which
//! credential submits the review. Evaluation is pure: no I/O, no state.
//!
//! Evaluation order:
//! 1. Without the opt-in label, deny.
//! 2. PRs authored by the maintenance bot are approved with the ambient
//!    workflow token (the app token cannot approve its own PRs).
//! 3. PRs by anyone else are approved with the app token when the author is a
//!    maintainer or the event was triggered by a trusted actor.
//! 4. Otherwise, deny.

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::event::{AuthorAssociation, PullRequestEvent};

/// Label that opts a pull request into automatic approval
pub const AUTO_APPROVE_LABEL: &str = "auto-approve";

/// Automation identity whose PRs are approved with the ambient token
pub const MAINTENANCE_BOT_LOGIN: &str = "team-cdk-terrain[bot]";

/// Actor allowed to trigger approval regardless of author association
pub const DEPENDABOT_ACTOR: &str = "dependabot[bot]";

/// Which credential submits the approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialScope {
    /// Short-lived GitHub App installation token
    BotAppToken,
    /// Ambient `GITHUB_TOKEN` of the run
    DefaultWorkflowToken,
    None,
}

impl std::fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialScope::BotAppToken => write!(f, "BOT_APP_TOKEN"),
            CredentialScope::DefaultWorkflowToken => write!(f, "DEFAULT_WORKFLOW_TOKEN"),
            CredentialScope::None => write!(f, "NONE"),
        }
    }
}

/// Outcome of a policy evaluation
///
/// Fields are private so that an approval always carries a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApprovalDecision {
    should_approve: bool,
    credential_scope: CredentialScope,
}

impl ApprovalDecision {
    pub fn deny() -> Self {
        Self {
            should_approve: false,
            credential_scope: CredentialScope::None,
        }
    }

    /// Approve using `scope`. Approving with [`CredentialScope::None`] is a deny.
    pub fn approve(scope: CredentialScope) -> Self {
        match scope {
            CredentialScope::None => Self::deny(),
            scope => Self {
                should_approve: true,
                credential_scope: scope,
            },
        }
    }

    pub fn should_approve(&self) -> bool {
        self.should_approve
    }

    pub fn credential_scope(&self) -> CredentialScope {
        self.credential_scope
    }
}

/// Policy parameters. `Default` is the production policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPolicy {
    pub label: String,
    pub maintenance_bot: String,
    pub trusted_associations: Vec<AuthorAssociation>,
    pub trusted_actors: Vec<String>,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            label: AUTO_APPROVE_LABEL.to_string(),
            maintenance_bot: MAINTENANCE_BOT_LOGIN.to_string(),
            trusted_associations: vec![
                AuthorAssociation::Owner,
                AuthorAssociation::Member,
                AuthorAssociation::Collaborator,
            ],
            trusted_actors: vec![DEPENDABOT_ACTOR.to_string()],
        }
    }
}

impl ApprovalPolicy {
    /// Set the opt-in label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the maintenance bot login
    pub fn maintenance_bot(mut self, login: impl Into<String>) -> Self {
        self.maintenance_bot = login.into();
        self
    }

    /// Decide approval and credential for a gated event.
    ///
    /// Callers only pass events for which
    /// [`PullRequestEvent::is_triggering`] holds.
    pub fn evaluate(&self, event: &PullRequestEvent) -> ApprovalDecision {
        let _span = info_span!(
            "policy_evaluate",
            pr_number = event.number,
            author = %event.author_login,
        )
        .entered();

        if !event.has_label(&self.label) {
            debug!(label = %self.label, "label absent, denying");
            return ApprovalDecision::deny();
        }

        if event.author_login == self.maintenance_bot {
            debug!("maintenance bot PR, approving with workflow token");
            return ApprovalDecision::approve(CredentialScope::DefaultWorkflowToken);
        }

        let trusted_author = self
            .trusted_associations
            .contains(&event.author_association);
        let trusted_actor = self.trusted_actors.iter().any(|a| *a == event.actor);

        if trusted_author || trusted_actor {
            debug!(
                association = %event.author_association,
                actor = %event.actor,
                "trusted PR, approving with app token"
            );
            return ApprovalDecision::approve(CredentialScope::BotAppToken);
        }

        debug!(
            association = %event.author_association,
            actor = %event.actor,
            "untrusted author and actor, denying"
        );
        ApprovalDecision::deny()
    }
}

/// Evaluate `event` against the default policy
pub fn evaluate(event: &PullRequestEvent) -> ApprovalDecision {
    ApprovalPolicy::default().evaluate(event)
}
