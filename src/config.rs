//! Configuration types, built from environment variables.
//!
//! A `.env` file in the working directory is loaded first (if present), so
//! deployments can keep credentials next to the binary. Variables already set
//! in the process environment take precedence over the file.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::resolution::MalformedPayloadPolicy;

/// Default wait between consume cycles: 5 minutes.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Default per-request HTTP timeout.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default signing region for Yandex Message Queue.
const DEFAULT_QUEUE_REGION: &str = "ru-central1";

/// Largest batch the SQS API hands out per receive.
const MAX_QUEUE_BATCH: usize = 10;

/// Longest long-poll wait the SQS API accepts.
const MAX_QUEUE_WAIT_SECS: u64 = 20;

/// Upper bound for the escalation approval step.
const MAX_ESCALATION_STEP: usize = 50;

const DEFAULT_SUPPORT_URL: &str = "https://help.ranepa.ru/portal";

/// Workflow (task system) API configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub auth_endpoint: String,
    pub login: String,
    pub secret_key: SecretString,
    /// Person to act on behalf of, if the bot is authorised to.
    pub person_id: Option<String>,
    /// Role inserted into the approval chain when processing fails.
    pub escalation_role_id: i64,
    /// 1-based approval step that receives the escalation role.
    pub escalation_step: usize,
    /// Help desk link rendered in the escalation comment.
    pub support_url: String,
}

/// Employment registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub host: String,
    pub base_path: String,
    pub user: String,
    pub password: SecretString,
}

/// Queue transport configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub endpoint: String,
    pub queue_name: String,
    pub queue_url: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub region: String,
    pub max_messages: usize,
    pub wait_time: Duration,
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workflow: WorkflowConfig,
    pub registry: RegistryConfig,
    pub queue: QueueConfig,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub malformed_payload_policy: MalformedPayloadPolicy,
}

impl AppConfig {
    /// Build config from the process environment, after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    key: ".env".into(),
                    message: e.to_string(),
                });
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(&lookup);

        let escalation_step: usize = env.parsed("WORKFLOW_ESCALATION_STEP")?;
        if !(1..=MAX_ESCALATION_STEP).contains(&escalation_step) {
            return Err(ConfigError::InvalidValue {
                key: "WORKFLOW_ESCALATION_STEP".into(),
                message: format!("must be between 1 and {MAX_ESCALATION_STEP}"),
            });
        }

        let workflow = WorkflowConfig {
            auth_endpoint: env.required("WORKFLOW_AUTH_ENDPOINT")?,
            login: env.required("WORKFLOW_LOGIN")?,
            secret_key: SecretString::from(env.required("WORKFLOW_SECRET_KEY")?),
            person_id: env.optional("WORKFLOW_PERSON_ID"),
            escalation_role_id: env.parsed("WORKFLOW_ESCALATION_ROLE_ID")?,
            escalation_step,
            support_url: env
                .optional("WORKFLOW_SUPPORT_URL")
                .unwrap_or_else(|| DEFAULT_SUPPORT_URL.to_string()),
        };

        let registry = RegistryConfig {
            host: env.required("REGISTRY_HOST")?,
            base_path: env.optional("REGISTRY_BASE_PATH").unwrap_or_default(),
            user: env.required("REGISTRY_USER")?,
            password: SecretString::from(env.required("REGISTRY_PASSWORD")?),
        };

        let max_messages = env.parsed_or("QUEUE_MAX_MESSAGES", MAX_QUEUE_BATCH)?;
        if !(1..=MAX_QUEUE_BATCH).contains(&max_messages) {
            return Err(ConfigError::InvalidValue {
                key: "QUEUE_MAX_MESSAGES".into(),
                message: format!("must be between 1 and {MAX_QUEUE_BATCH}"),
            });
        }

        let wait_secs = env.parsed_or("QUEUE_WAIT_SECONDS", MAX_QUEUE_WAIT_SECS)?;
        if wait_secs > MAX_QUEUE_WAIT_SECS {
            return Err(ConfigError::InvalidValue {
                key: "QUEUE_WAIT_SECONDS".into(),
                message: format!("must not exceed {MAX_QUEUE_WAIT_SECS}"),
            });
        }

        let queue = QueueConfig {
            endpoint: env.required("QUEUE_ENDPOINT")?,
            queue_name: env.required("QUEUE_NAME")?,
            queue_url: env.required("QUEUE_URL")?,
            access_key_id: env.required("QUEUE_ACCESS_KEY_ID")?,
            secret_access_key: SecretString::from(env.required("QUEUE_SECRET_ACCESS_KEY")?),
            region: env
                .optional("QUEUE_REGION")
                .unwrap_or_else(|| DEFAULT_QUEUE_REGION.to_string()),
            max_messages,
            wait_time: Duration::from_secs(wait_secs),
        };

        let malformed_payload_policy = match env.optional("MALFORMED_PAYLOAD_POLICY") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "MALFORMED_PAYLOAD_POLICY".into(),
                message,
            })?,
            None => MalformedPayloadPolicy::default(),
        };

        Ok(Self {
            workflow,
            registry,
            queue,
            poll_interval: Duration::from_secs(
                env.parsed_or("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            ),
            http_timeout: Duration::from_secs(
                env.parsed_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            ),
            malformed_payload_policy,
        })
    }
}

/// Typed accessors over a string lookup. Blank values count as unset.
struct Lookup<'a, F>(&'a F);

impl<F> Lookup<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parsed<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(key)?;
        raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(_) => self.parsed(key),
            None => Ok(default),
        }
    }
}
