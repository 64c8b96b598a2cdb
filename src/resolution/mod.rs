//! Task resolution: turns a message group into a workflow decision.
//!
//! Flow per group:
//! 1. Parse the `Person` from the group's latest message
//! 2. Look the person up in the employment registry
//! 3. Pick the earliest contract and map its type to a decision
//! 4. Comment the task; on any failure, escalate instead

pub mod engine;
pub mod person;
pub mod templates;

pub use engine::{Escalation, MalformedPayloadPolicy, ResolutionEngine, decide, select_contract};
pub use person::Person;
