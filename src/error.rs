//! Error types for the HR resolver.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Queue transport errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue {action} request failed: {reason}")]
    Request { action: String, reason: String },

    #[error("Queue {action} returned {status}: {body}")]
    Status {
        action: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode queue {action} response: {reason}")]
    Decode { action: String, reason: String },

    #[error("Failed to sign queue request: {0}")]
    Signing(String),
}

/// Employment registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry request failed: {0}")]
    Request(String),

    #[error("Registry returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Registry returned an unexpected response body: {0}")]
    UnexpectedBody(String),

    #[error("Failed to decode employee contract: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Workflow API errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow authentication failed with status {status}")]
    Auth { status: u16 },

    #[error("Failed to comment task {task_id}: {status} {body}")]
    Comment {
        task_id: String,
        status: u16,
        body: String,
    },

    #[error("Workflow request failed: {0}")]
    Request(String),

    #[error("Workflow API base URL is invalid: {0}")]
    InvalidBase(String),
}

/// Failures while resolving a single message group.
///
/// Every variant ends in the escalation path; `category` is the label shown
/// to the task participants.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Malformed message payload: {0}")]
    PayloadParse(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl ResolveError {
    /// Short error category used in the escalation comment.
    pub fn category(&self) -> &'static str {
        match self {
            Self::PayloadParse(_) => "PayloadParseError",
            Self::Registry(_) => "RegistryError",
            Self::Workflow(WorkflowError::Auth { .. }) => "WorkflowAuthError",
            Self::Workflow(_) => "WorkflowCommentError",
            Self::Unexpected(_) => "UnexpectedError",
        }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
