//! Webhook event models
//!
//! Typed representations of the GitHub `workflow_job` webhook payload.
//! Only the fields the autoscaler acts on are modeled; everything else
//! in the delivery is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// The action that triggered the workflow job webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowJobAction {
    /// The job was created
    Created,

    /// The job is queued and waiting for a runner to pick it up
    Queued,

    /// The job is waiting on a deployment approval
    Waiting,

    /// A runner has claimed the job
    InProgress,
}

impl std::fmt::Display for WorkflowJobAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowJobAction::Created => write!(f, "created"),
            WorkflowJobAction::Queued => write!(f, "queued"),
            WorkflowJobAction::Waiting => write!(f, "waiting"),
            WorkflowJobAction::InProgress => write!(f, "in_progress"),
        }
    }
}

/// A GitHub account: a repository owner or an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Numeric account id
    pub id: u64,

    /// Login name, used as the owner segment in registration URLs
    pub login: String,
}

/// The repository a workflow job belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Numeric repository id
    pub id: u64,

    /// Repository name without the owner prefix
    pub name: String,

    /// Full `owner/name` identifier
    pub full_name: String,

    /// Whether the repository is private
    pub private: bool,

    /// The account that owns the repository
    pub owner: Account,
}

/// The `workflow_job` webhook payload
///
/// Parsed once per inbound delivery and discarded after dispatch. The
/// `organization` field is only present for deliveries configured at
/// the organization level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowJobWebhookPayload {
    /// The action that triggered the delivery
    pub action: WorkflowJobAction,

    /// The repository the job belongs to
    pub repository: Repository,

    /// The organization, for org-level webhook configurations
    #[serde(default)]
    pub organization: Option<Account>,
}
