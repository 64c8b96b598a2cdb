//! Employment contract records as returned by the registry.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Date format used by the registry (and in rendered comments).
pub const REGISTRY_DATE_FORMAT: &str = "%d.%m.%Y";

/// Kind of employment relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ContractType {
    /// Open-ended employment.
    #[serde(rename = "Бессрочный")]
    Permanent,
    /// Fixed-term employment.
    #[serde(rename = "Срочный")]
    Temporary,
    /// Civil-law (contractor) agreement.
    #[serde(rename = "ГПХ")]
    CivilLaw,
}

/// One contract between a worker and the organisation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmployeeContract {
    #[serde(rename = "WorkerID")]
    pub worker_id: String,
    #[serde(rename = "SNILS")]
    pub national_id_number: String,
    #[serde(rename = "WorkerName")]
    pub worker_name: String,
    #[serde(rename = "Department")]
    pub department: String,
    /// Capitalized on decode.
    #[serde(rename = "Position", deserialize_with = "capitalized")]
    pub position: String,
    #[serde(rename = "ContractType")]
    pub contract_type: ContractType,
    /// `None` when absent or not a `dd.mm.yyyy` date.
    #[serde(rename = "DateStart", default, deserialize_with = "lenient_date")]
    pub date_start: Option<NaiveDate>,
    #[serde(rename = "DateEnd", default, deserialize_with = "lenient_date")]
    pub date_end: Option<NaiveDate>,
}

/// Upper-case the first character, lower-case the rest.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Parse a registry date, treating anything unparseable as unknown.
pub fn parse_registry_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), REGISTRY_DATE_FORMAT).ok()
}

fn capitalized<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(capitalize(&raw))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    // Accept any JSON value so a stray number or object degrades to "unknown".
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse_registry_date))
}
