//! Types for commenting workflow tasks.

use serde::{Deserialize, Serialize};

/// Approval decision attached to a task comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    #[default]
    Acknowledged,
    Rejected,
    Revoked,
}

impl ApprovalDecision {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Acknowledged => "acknowledged",
            Self::Rejected => "rejected",
            Self::Revoked => "revoked",
        }
    }
}

/// A role (or person) placed on an approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRole {
    pub id: i64,
}

/// Per-step role lists, index 0 being approval step 1.
pub type ApprovalSteps = Vec<Vec<ApprovalRole>>;

/// Approval-chain change that puts `role_id` on the 1-based `step` and
/// leaves every earlier step untouched.
///
/// A `step` of 0 is treated as 1.
pub fn role_at_step(role_id: i64, step: usize) -> ApprovalSteps {
    let mut steps: ApprovalSteps = vec![Vec::new(); step.saturating_sub(1)];
    steps.push(vec![ApprovalRole { id: role_id }]);
    steps
}

/// A comment to post on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskComment {
    /// HTML-formatted text.
    pub text: String,
    pub decision: ApprovalDecision,
    pub approvals_added: ApprovalSteps,
    pub approvals_removed: ApprovalSteps,
}

impl TaskComment {
    pub fn new(text: impl Into<String>, decision: ApprovalDecision) -> Self {
        Self {
            text: text.into(),
            decision,
            approvals_added: Vec::new(),
            approvals_removed: Vec::new(),
        }
    }

    /// Builder: add roles to approval steps.
    pub fn with_approvals_added(mut self, steps: ApprovalSteps) -> Self {
        self.approvals_added = steps;
        self
    }

    /// Builder: remove roles from approval steps.
    pub fn with_approvals_removed(mut self, steps: ApprovalSteps) -> Self {
        self.approvals_removed = steps;
        self
    }
}
