//! Workflow (task system) API: approval decisions and task comments.

pub mod client;
pub mod types;

pub use client::{HttpWorkflowClient, WorkflowApi};
pub use types::{ApprovalDecision, ApprovalRole, ApprovalSteps, TaskComment, role_at_step};
