//! SQS-compatible queue transport (Yandex Message Queue).
//!
//! Speaks the SQS JSON 1.0 protocol over `reqwest`, signed with SigV4 using
//! static credentials. Only `ReceiveMessage` and `DeleteMessage` are used.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::queue::sigv4::{self, SigningParams};
use crate::queue::transport::QueueTransport;
use crate::queue::types::ReceivedMessage;

const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

const SIGNING_SERVICE: &str = "sqs";

/// Correlation attribute the consumer groups by.
const GROUP_ATTRIBUTE: &str = "MessageGroupId";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReceiveMessageResponse {
    #[serde(default)]
    messages: Vec<SqsMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SqsMessage {
    #[serde(default)]
    body: String,
    #[serde(default)]
    receipt_handle: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

/// Queue transport backed by an SQS-compatible HTTP endpoint.
pub struct SqsTransport {
    config: QueueConfig,
    endpoint: Url,
    host: String,
    client: reqwest::Client,
}

impl SqsTransport {
    /// Create a transport. `request_timeout` is added on top of the long-poll
    /// wait so a full wait never trips the HTTP timeout.
    pub fn new(config: QueueConfig, request_timeout: Duration) -> Result<Self, QueueError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| QueueError::Request {
            action: "configure".into(),
            reason: format!("invalid endpoint {}: {e}", config.endpoint),
        })?;

        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(QueueError::Request {
                    action: "configure".into(),
                    reason: format!("endpoint {} has no host", config.endpoint),
                });
            }
        };

        let client = reqwest::Client::builder()
            .timeout(config.wait_time.saturating_add(request_timeout))
            .build()
            .map_err(|e| QueueError::Request {
                action: "configure".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            config,
            endpoint,
            host,
            client,
        })
    }

    /// POST a signed SQS JSON action and return the raw response body.
    async fn call(&self, action: &str, body: serde_json::Value) -> Result<String, QueueError> {
        let payload = serde_json::to_vec(&body).map_err(|e| QueueError::Request {
            action: action.to_string(),
            reason: e.to_string(),
        })?;
        let target = format!("AmazonSQS.{action}");

        let params = SigningParams {
            access_key_id: &self.config.access_key_id,
            secret_access_key: self.config.secret_access_key.expose_secret(),
            region: &self.config.region,
            service: SIGNING_SERVICE,
        };
        let signed = sigv4::sign(
            &params,
            "POST",
            self.endpoint.path(),
            &[
                ("content-type", CONTENT_TYPE),
                ("host", &self.host),
                ("x-amz-target", &target),
            ],
            &payload,
            chrono::Utc::now(),
        )?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", &target)
            .header("X-Amz-Date", &signed.amz_date)
            .header("Authorization", &signed.authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| QueueError::Request {
                action: action.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| QueueError::Request {
            action: action.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(QueueError::Status {
                action: action.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let body = json!({
            "QueueUrl": self.config.queue_url,
            "MaxNumberOfMessages": max_messages,
            "WaitTimeSeconds": wait_time.as_secs(),
            "AttributeNames": [GROUP_ATTRIBUTE],
        });

        let text = self.call("ReceiveMessage", body).await?;
        let response: ReceiveMessageResponse =
            serde_json::from_str(&text).map_err(|e| QueueError::Decode {
                action: "ReceiveMessage".into(),
                reason: e.to_string(),
            })?;

        Ok(response
            .messages
            .into_iter()
            .map(|mut message| ReceivedMessage {
                correlation_key: message.attributes.remove(GROUP_ATTRIBUTE),
                body: message.body,
                delete_handle: message.receipt_handle,
            })
            .collect())
    }

    async fn delete(&self, delete_handle: &str) -> Result<(), QueueError> {
        let body = json!({
            "QueueUrl": self.config.queue_url,
            "ReceiptHandle": delete_handle,
        });

        self.call("DeleteMessage", body).await?;
        Ok(())
    }

    fn queue_name(&self) -> &str {
        &self.config.queue_name
    }
}
