//! Grouped work queue: transport abstraction, SQS implementation, and the
//! consumer that groups each batch by correlation key.

pub mod consumer;
pub(crate) mod sigv4;
pub mod sqs;
pub mod transport;
pub mod types;

pub use consumer::{GroupHandler, QueueConsumer};
pub use sqs::SqsTransport;
pub use transport::QueueTransport;
pub use types::{ConsumeReport, Message, MessageGroup, ReceivedMessage};
