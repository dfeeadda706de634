//! Pull Request Events
//!
//! Typed view of a GitHub `pull_request` / `pull_request_target` webhook
//! payload, reduced to the fields the approval policy looks at.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{ApproveError, Result};

/// Pull request action that delivered the event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    Labeled,
    ReadyForReview,
    Reopened,
    /// Any action that never triggers approval (synchronize, closed, ...)
    #[serde(other)]
    Other,
}

impl PullRequestAction {
    /// Whether this action is one of the approval triggers
    pub fn is_trigger(&self) -> bool {
        !matches!(self, PullRequestAction::Other)
    }
}

/// Relationship of the PR author to the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorAssociation {
    Owner,
    Member,
    Collaborator,
    Contributor,
    FirstTimeContributor,
    FirstTimer,
    Mannequin,
    None,
}

impl std::fmt::Display for AuthorAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            AuthorAssociation::Owner => "OWNER",
            AuthorAssociation::Member => "MEMBER",
            AuthorAssociation::Collaborator => "COLLABORATOR",
            AuthorAssociation::Contributor => "CONTRIBUTOR",
            AuthorAssociation::FirstTimeContributor => "FIRST_TIME_CONTRIBUTOR",
            AuthorAssociation::FirstTimer => "FIRST_TIMER",
            AuthorAssociation::Mannequin => "MANNEQUIN",
            AuthorAssociation::None => "NONE",
        };
        write!(f, "{}", value)
    }
}

/// A pull request event as seen by the approval policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub is_draft: bool,
    pub labels: BTreeSet<String>,
    pub author_login: String,
    pub author_association: AuthorAssociation,
    /// Identity that triggered the event (webhook `sender`)
    pub actor: String,
    /// PR number, used when submitting the review
    pub number: u64,
    /// Base repository in `owner/repo` form
    pub repository: String,
    pub head_ref: Option<String>,
}

impl PullRequestEvent {
    /// Decode a GitHub webhook payload.
    ///
    /// # Errors
    /// Returns [`ApproveError::InvalidEvent`] if the body is not JSON or a
    /// required field is missing.
    pub fn from_webhook(body: &[u8]) -> Result<Self> {
        let payload: WebhookPayload = serde_json::from_slice(body)?;
        payload.try_into()
    }

    /// Upstream gate: a triggering action on a non-draft PR
    pub fn is_triggering(&self) -> bool {
        self.action.is_trigger() && !self.is_draft
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

// Raw payload shapes. Everything is optional so that a missing field is
// reported by name instead of as a generic serde error.

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    action: Option<PullRequestAction>,
    pull_request: Option<PullRequestPayload>,
    sender: Option<UserPayload>,
    repository: Option<RepositoryPayload>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: Option<u64>,
    #[serde(default)]
    draft: bool,
    labels: Option<Vec<LabelPayload>>,
    user: Option<UserPayload>,
    author_association: Option<AuthorAssociation>,
    head: Option<HeadPayload>,
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeadPayload {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    full_name: Option<String>,
}

fn missing(field: &str) -> ApproveError {
    ApproveError::InvalidEvent(format!("missing field `{}`", field))
}

impl TryFrom<WebhookPayload> for PullRequestEvent {
    type Error = ApproveError;

    fn try_from(payload: WebhookPayload) -> Result<Self> {
        let action = payload.action.ok_or_else(|| missing("action"))?;
        let pr = payload
            .pull_request
            .ok_or_else(|| missing("pull_request"))?;
        let labels = pr
            .labels
            .ok_or_else(|| missing("pull_request.labels"))?
            .into_iter()
            .map(|label| label.name)
            .collect();
        let author_login = pr
            .user
            .and_then(|user| user.login)
            .ok_or_else(|| missing("pull_request.user.login"))?;
        let author_association = pr
            .author_association
            .ok_or_else(|| missing("pull_request.author_association"))?;
        let number = pr.number.ok_or_else(|| missing("pull_request.number"))?;
        let actor = payload
            .sender
            .and_then(|sender| sender.login)
            .ok_or_else(|| missing("sender.login"))?;
        let repository = payload
            .repository
            .and_then(|repo| repo.full_name)
            .ok_or_else(|| missing("repository.full_name"))?;

        Ok(Self {
            action,
            is_draft: pr.draft,
            labels,
            author_login,
            author_association,
            actor,
            number,
            repository,
            head_ref: pr.head.and_then(|head| head.git_ref),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn webhook_body(
        action: &str,
        labels: &[&str],
        author: &str,
        association: &str,
        sender: &str,
    ) -> Vec<u8> {
        let labels: Vec<_> = labels.iter().map(|name| json!({ "name": name })).collect();
        serde_json::to_vec(&json!({
            "action": action,
            "number": 42,
            "pull_request": {
                "number": 42,
                "draft": false,
                "labels": labels,
                "user": { "login": author },
                "author_association": association,
                "head": { "ref": "feature/deps" }
            },
            "sender": { "login": sender },
            "repository": { "full_name": "cdktn-io/provider-random" }
        }))
        .unwrap()
    }

    fn opened_payload() -> serde_json::Value {
        serde_json::from_slice(&webhook_body("opened", &[], "alice", "OWNER", "alice")).unwrap()
    }

    fn decode(value: &serde_json::Value) -> Result<PullRequestEvent> {
        PullRequestEvent::from_webhook(&serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_decodes_webhook_payload() {
        let labels = ["auto-approve", "dependencies"];
        let body = webhook_body("labeled", &labels, "alice", "MEMBER", "bob");
        let event = PullRequestEvent::from_webhook(&body).unwrap();

        assert_eq!(event.action, PullRequestAction::Labeled);
        assert!(!event.is_draft);
        assert!(event.has_label("auto-approve"));
        assert!(event.has_label("dependencies"));
        assert_eq!(event.author_login, "alice");
        assert_eq!(event.author_association, AuthorAssociation::Member);
        assert_eq!(event.actor, "bob");
        assert_eq!(event.number, 42);
        assert_eq!(event.repository, "cdktn-io/provider-random");
        assert_eq!(event.head_ref.as_deref(), Some("feature/deps"));
    }

    #[test]
    fn test_unknown_action_decodes_as_other() {
        let body = webhook_body("synchronize", &["auto-approve"], "alice", "OWNER", "alice");
        let event = PullRequestEvent::from_webhook(&body).unwrap();

        assert_eq!(event.action, PullRequestAction::Other);
        assert!(!event.is_triggering());
    }

    #[test]
    fn test_draft_is_not_triggering() {
        let mut value = opened_payload();
        value["pull_request"]["draft"] = json!(true);
        let event = decode(&value).unwrap();

        assert!(event.is_draft);
        assert!(!event.is_triggering());
    }

    #[test]
    fn test_triggering_actions() {
        for action in ["opened", "labeled", "ready_for_review", "reopened"] {
            let body = webhook_body(action, &[], "alice", "NONE", "alice");
            let event = PullRequestEvent::from_webhook(&body).unwrap();
            assert!(event.is_triggering(), "{} should trigger", action);
        }
    }

    #[test]
    fn test_missing_draft_defaults_to_false() {
        let mut value = opened_payload();
        value["pull_request"].as_object_mut().unwrap().remove("draft");
        let event = decode(&value).unwrap();

        assert!(!event.is_draft);
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut value = opened_payload();
        value["pull_request"]
            .as_object_mut()
            .unwrap()
            .remove("author_association");

        let err = decode(&value).unwrap_err();
        match err {
            ApproveError::InvalidEvent(msg) => assert!(msg.contains("author_association")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_sender_is_invalid() {
        let mut value = opened_payload();
        value.as_object_mut().unwrap().remove("sender");

        let err = decode(&value).unwrap_err();
        assert!(err.to_string().contains("sender.login"));
    }

    #[test]
    fn test_malformed_json_is_invalid_event() {
        let err = PullRequestEvent::from_webhook(b"{not json").unwrap_err();
        assert!(matches!(err, ApproveError::InvalidEvent(_)));
    }

    #[test]
    fn test_author_association_display() {
        assert_eq!(AuthorAssociation::FirstTimeContributor.to_string(), "FIRST_TIME_CONTRIBUTOR");
        assert_eq!(AuthorAssociation::None.to_string(), "NONE");
    }
}
