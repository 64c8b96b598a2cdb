//! HR task resolver: answers workflow approval tasks from the employment
//! registry.

pub mod config;
pub mod error;
pub mod poller;
pub mod queue;
pub mod registry;
pub mod resolution;
pub mod workflow;
