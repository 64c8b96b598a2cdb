//! HTTP client for the employment registry.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::registry::types::EmployeeContract;

/// Lookup of a person's contracts.
#[async_trait]
pub trait EmploymentRegistry: Send + Sync {
    /// All contracts on record for the person; empty if none.
    async fn find_contracts(
        &self,
        full_name: &str,
        national_id_number: &str,
    ) -> Result<Vec<EmployeeContract>, RegistryError>;
}

/// Registry client over an HTTP GET endpoint with basic auth.
pub struct HttpRegistryClient {
    config: RegistryConfig,
    client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(config: RegistryConfig, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Full lookup URL. Values are percent-encoded (spaces as `%20`).
    fn contracts_url(&self, full_name: &str, national_id_number: &str) -> String {
        format!(
            "{}{}/EmployeeContracts?Name={}&SNILS={}",
            self.config.host.trim_end_matches('/'),
            self.config.base_path,
            urlencoding::encode(full_name),
            urlencoding::encode(national_id_number),
        )
    }
}

#[async_trait]
impl EmploymentRegistry for HttpRegistryClient {
    async fn find_contracts(
        &self,
        full_name: &str,
        national_id_number: &str,
    ) -> Result<Vec<EmployeeContract>, RegistryError> {
        debug!(worker = %full_name, "Querying employment registry");

        let response = self
            .client
            .get(self.contracts_url(full_name, national_id_number))
            .basic_auth(&self.config.user, Some(self.config.password.expose_secret()))
            .send()
            .await
            .map_err(|e| RegistryError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RegistryError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let contracts = decode_contracts(&text)?;
        info!(
            worker = %full_name,
            contracts = contracts.len(),
            "Employment registry lookup complete"
        );
        Ok(contracts)
    }
}

/// Decode a registry response body, which must be a JSON array.
pub fn decode_contracts(body: &str) -> Result<Vec<EmployeeContract>, RegistryError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(RegistryError::from))
            .collect(),
        other => Err(RegistryError::UnexpectedBody(format!(
            "expected an array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
