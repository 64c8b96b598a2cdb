//! The person a task is about, as carried in the queue payload.

use serde::Deserialize;

use crate::error::ResolveError;

/// Person record from a task payload.
///
/// Only the name and SNILS are used; any other task fields are kept in
/// `extra` untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Person {
    #[serde(rename = "fullname")]
    pub full_name: String,
    #[serde(rename = "snils")]
    pub national_id_number: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Person {
    /// Parse a JSON payload.
    pub fn from_payload(text: &str) -> Result<Self, ResolveError> {
        serde_json::from_str(text).map_err(|e| ResolveError::PayloadParse(e.to_string()))
    }
}
