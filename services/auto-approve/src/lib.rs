//! Auto-Approve Library
//!
//! Approves GitHub pull requests that carry the `auto-approve` label.
//!
//! ## Pipeline
//!
//! 1. [`event`] decodes the `pull_request_target` webhook payload and gates on
//!    the action (`opened`, `labeled`, `ready_for_review`, `reopened`) and
//!    draft state
//! 2. [`policy`] decides whether to approve and with which credential
//! 3. [`auth`] mints a GitHub App installation token when the decision asks
//!    for one; PRs opened by the maintenance bot use the ambient
//!    `GITHUB_TOKEN` instead
//! 4. [`review`] submits the `APPROVE` review
//!
//! [`approver::AutoApprover`] ties the steps together and [`server`] exposes
//! it as a webhook endpoint (`approve-webhook` binary).
//!
//! ## Example
//!
//! ```
//! use auto_approve::event::{AuthorAssociation, PullRequestAction, PullRequestEvent};
//! use auto_approve::policy::{evaluate, CredentialScope};
//!
//! let event = PullRequestEvent {
//!     action: PullRequestAction::Labeled,
//!     is_draft: false,
//!     labels: ["auto-approve".to_string()].into_iter().collect(),
//!     author_login: "alice".to_string(),
//!     author_association: AuthorAssociation::Member,
//!     actor: "alice".to_string(),
//!     number: 1,
//!     repository: "cdktn-io/provider-random".to_string(),
//!     head_ref: None,
//! };
//!
//! let decision = evaluate(&event);
//! assert!(decision.should_approve());
//! assert_eq!(decision.credential_scope(), CredentialScope::BotAppToken);
//! ```

pub mod approver;
pub mod auth;
pub mod config;
pub mod error;
pub mod event;
pub mod policy;
pub mod review;
pub mod server;

#[cfg(test)]
mod stub;

pub use approver::{AutoApprover, Outcome};
pub use error::ApproveError;
pub use event::PullRequestEvent;
pub use policy::{evaluate, ApprovalDecision, ApprovalPolicy, CredentialScope};
