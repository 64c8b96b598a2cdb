//! Employment registry: contract records and the HTTP client that fetches them.

pub mod client;
pub mod types;

pub use client::{EmploymentRegistry, HttpRegistryClient};
pub use types::{ContractType, EmployeeContract, REGISTRY_DATE_FORMAT};
