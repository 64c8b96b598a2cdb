//! Queue transport trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueError;
use crate::queue::types::ReceivedMessage;

/// Receive/delete operations the consumer needs from a queue backend.
///
/// Messages that are received but not deleted become visible again once the
/// backend's visibility timeout lapses.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Long-poll for up to `max_messages`, waiting at most `wait_time`.
    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Remove a message from the queue for good.
    async fn delete(&self, delete_handle: &str) -> Result<(), QueueError>;

    /// Queue name, for logging.
    fn queue_name(&self) -> &str;
}
