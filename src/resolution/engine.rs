//! Resolution engine: applies the employment rules to one message group.
//!
//! Outcomes by earliest contract:
//! - none → approved
//! - permanent or temporary → rejected
//! - civil-law → approved
//!
//! Any failure posts an escalation comment (`revoked`, escalation role added
//! to the configured approval step) and leaves the group for redelivery.
//! If the escalation comment cannot be posted either, the error propagates.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::config::WorkflowConfig;
use crate::error::{Error, ResolveError, WorkflowError};
use crate::queue::{GroupHandler, MessageGroup};
use crate::registry::{ContractType, EmployeeContract, EmploymentRegistry};
use crate::resolution::person::Person;
use crate::resolution::templates;
use crate::workflow::{ApprovalDecision, TaskComment, WorkflowApi, role_at_step};

/// What to do with a group whose payload cannot be parsed.
///
/// The escalation comment is posted either way; the policy only decides
/// whether the messages are deleted afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPayloadPolicy {
    /// Delete the messages: redelivering the same bytes cannot succeed.
    #[default]
    Discard,
    /// Leave the messages for redelivery like any other failure.
    Redeliver,
}

impl MalformedPayloadPolicy {
    /// Whether the group's messages are deleted.
    pub fn deletes(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

impl FromStr for MalformedPayloadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "redeliver" => Ok(Self::Redeliver),
            other => Err(format!(
                "unknown policy '{other}', expected 'discard' or 'redeliver'"
            )),
        }
    }
}

/// Where failures are escalated to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub role_id: i64,
    /// 1-based approval step.
    pub step: usize,
    pub support_url: String,
}

impl From<&WorkflowConfig> for Escalation {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            role_id: config.escalation_role_id,
            step: config.escalation_step,
            support_url: config.support_url.clone(),
        }
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Resolves workflow tasks against the employment registry.
pub struct ResolutionEngine {
    registry: Arc<dyn EmploymentRegistry>,
    workflow: Arc<dyn WorkflowApi>,
    escalation: Escalation,
    malformed_payload_policy: MalformedPayloadPolicy,
    today: fn() -> NaiveDate,
}

impl ResolutionEngine {
    pub fn new(
        registry: Arc<dyn EmploymentRegistry>,
        workflow: Arc<dyn WorkflowApi>,
        escalation: Escalation,
    ) -> Self {
        Self {
            registry,
            workflow,
            escalation,
            malformed_payload_policy: MalformedPayloadPolicy::default(),
            today: local_today,
        }
    }

    /// Builder: set the malformed payload policy.
    pub fn with_malformed_payload_policy(mut self, policy: MalformedPayloadPolicy) -> Self {
        self.malformed_payload_policy = policy;
        self
    }

    /// Builder: replace the clock used for "as of today" texts.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Process one group. `Ok(true)` means its messages may be deleted.
    ///
    /// `Err` is returned only when the escalation comment itself could not be
    /// posted.
    pub async fn process(&self, group: &MessageGroup) -> Result<bool, WorkflowError> {
        let task_id = group.group_id.as_str();

        if task_id.is_empty() {
            // No task to comment on, so no escalation notice either: keep the
            // messages whatever the payload policy says.
            warn!(
                messages = group.messages.len(),
                "Message group has no task ID, leaving it on the queue"
            );
            return Ok(false);
        }

        info!(task_id = %task_id, messages = group.messages.len(), "Processing workflow task");

        match self.resolve(task_id, group).await {
            Ok(decision) => {
                info!(task_id = %task_id, decision = decision.label(), "Workflow task resolved");
                Ok(true)
            }
            Err(err) => {
                error!(
                    task_id = %task_id,
                    category = err.category(),
                    error = %err,
                    "Failed to resolve workflow task, escalating"
                );
                self.escalate(task_id, &err).await?;

                Ok(match err {
                    ResolveError::PayloadParse(_) => self.malformed_payload_policy.deletes(),
                    _ => false,
                })
            }
        }
    }

    async fn resolve(
        &self,
        task_id: &str,
        group: &MessageGroup,
    ) -> Result<ApprovalDecision, ResolveError> {
        let message = group
            .latest()
            .ok_or_else(|| ResolveError::Unexpected("message group is empty".into()))?;
        let person = Person::from_payload(&message.text)?;

        let contracts = self
            .registry
            .find_contracts(&person.full_name, &person.national_id_number)
            .await?;
        debug!(task_id = %task_id, contracts = contracts.len(), "Fetched employee contracts");

        let comment = decide(&person, &contracts, (self.today)());
        self.workflow.comment_task(task_id, &comment).await?;

        Ok(comment.decision)
    }

    async fn escalate(&self, task_id: &str, err: &ResolveError) -> Result<(), WorkflowError> {
        let comment = TaskComment::new(
            templates::escalation(err.category(), &self.escalation.support_url),
            ApprovalDecision::Revoked,
        )
        .with_approvals_added(role_at_step(self.escalation.role_id, self.escalation.step));

        self.workflow.comment_task(task_id, &comment).await.map_err(|e| {
            error!(task_id = %task_id, error = %e, "Failed to post escalation comment");
            e
        })
    }
}

#[async_trait]
impl GroupHandler for ResolutionEngine {
    async fn handle(&self, group: &MessageGroup) -> Result<bool, Error> {
        Ok(self.process(group).await?)
    }
}

/// Pick the contract with the earliest start date.
///
/// Undated contracts sort after every dated one; ties keep registry order.
pub fn select_contract(contracts: &[EmployeeContract]) -> Option<&EmployeeContract> {
    contracts
        .iter()
        .enumerate()
        .min_by_key(|(index, contract)| {
            (contract.date_start.is_none(), contract.date_start, *index)
        })
        .map(|(_, contract)| contract)
}

/// Map a registry lookup result to the comment to post.
pub fn decide(person: &Person, contracts: &[EmployeeContract], today: NaiveDate) -> TaskComment {
    let Some(contract) = select_contract(contracts) else {
        return TaskComment::new(
            templates::no_employment(&person.full_name, today),
            ApprovalDecision::Approved,
        );
    };

    match contract.contract_type {
        ContractType::Permanent => TaskComment::new(
            templates::permanent(&person.full_name, contract),
            ApprovalDecision::Rejected,
        ),
        ContractType::Temporary => TaskComment::new(
            templates::temporary(&person.full_name, contract),
            ApprovalDecision::Rejected,
        ),
        ContractType::CivilLaw => TaskComment::new(
            templates::civil_law(&person.full_name, contract),
            ApprovalDecision::Approved,
        ),
    }
}
