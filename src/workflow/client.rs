//! HTTP client for the workflow API.
//!
//! Authentication is lazy: the first comment call obtains an access token and
//! the API base URL, and both are kept for the life of the client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::workflow::types::{ApprovalDecision, ApprovalSteps, TaskComment};

/// Operations the resolver needs from the workflow system.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Post a comment (with decision and approval-chain changes) on a task.
    async fn comment_task(&self, task_id: &str, comment: &TaskComment)
    -> Result<(), WorkflowError>;
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    login: &'a str,
    security_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    person_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct AuthResponse {
    api_url: String,
    access_token: SecretString,
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    formatted_text: &'a str,
    approval_choice: ApprovalDecision,
    approvals_added: &'a ApprovalSteps,
    approvals_removed: &'a ApprovalSteps,
}

/// Authenticated session state.
struct Session {
    /// Always ends with `/`.
    api_url: String,
    access_token: SecretString,
}

/// Workflow client over the HTTP API.
pub struct HttpWorkflowClient {
    config: WorkflowConfig,
    client: reqwest::Client,
    session: Mutex<Option<Session>>,
}

impl HttpWorkflowClient {
    pub fn new(config: WorkflowConfig, timeout: Duration) -> Result<Self, WorkflowError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkflowError::Request(e.to_string()))?;
        Ok(Self {
            config,
            client,
            session: Mutex::new(None),
        })
    }

    async fn login(&self) -> Result<Session, WorkflowError> {
        debug!(endpoint = %self.config.auth_endpoint, "Authenticating with workflow API");

        let body = AuthRequest {
            login: &self.config.login,
            security_key: self.config.secret_key.expose_secret(),
            person_id: self.config.person_id.as_deref(),
        };

        let response = self
            .client
            .post(&self.config.auth_endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::Auth {
                status: status.as_u16(),
            });
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::Request(format!("invalid auth response: {e}")))?;

        if auth.api_url.trim().is_empty() {
            return Err(WorkflowError::InvalidBase(auth.api_url));
        }

        let mut api_url = auth.api_url;
        if !api_url.ends_with('/') {
            api_url.push('/');
        }

        info!(api_url = %api_url, "Authenticated with workflow API");
        Ok(Session {
            api_url,
            access_token: auth.access_token,
        })
    }
}

#[async_trait]
impl WorkflowApi for HttpWorkflowClient {
    async fn comment_task(
        &self,
        task_id: &str,
        comment: &TaskComment,
    ) -> Result<(), WorkflowError> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.login().await?);
        }
        let Some(active) = session.as_ref() else {
            return Err(WorkflowError::Request("no workflow session".into()));
        };

        let url = format!(
            "{}tasks/{}/comments",
            active.api_url,
            urlencoding::encode(task_id)
        );
        let body = CommentRequest {
            formatted_text: &comment.text,
            approval_choice: comment.decision,
            approvals_added: &comment.approvals_added,
            approvals_removed: &comment.approvals_removed,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(active.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Comment {
                task_id: task_id.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        info!(
            task_id = %task_id,
            decision = comment.decision.label(),
            "Commented workflow task"
        );
        Ok(())
    }
}
