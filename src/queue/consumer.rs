//! Queue consumer: receives one batch, groups it by correlation key, and
//! deletes the messages of every group the handler resolves.
//!
//! Delivery is at-least-once:
//! 1. A group whose handler returns `false` stays on the queue untouched
//! 2. A failed delete is logged and left for redelivery, never retried in-cycle
//! 3. A handler `Err` ends the cycle; that group and the rest of the batch
//!    come back after the visibility timeout

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::{Error, QueueError};
use crate::queue::transport::QueueTransport;
use crate::queue::types::{ConsumeReport, Message, MessageGroup, ReceivedMessage};

/// Per-group processing callback.
#[async_trait]
pub trait GroupHandler: Send + Sync {
    /// Handle one group. `Ok(true)` means every message of the group may be
    /// deleted; `Ok(false)` leaves them for redelivery.
    async fn handle(&self, group: &MessageGroup) -> Result<bool, Error>;
}

/// Consumer over a grouped queue.
pub struct QueueConsumer {
    transport: Arc<dyn QueueTransport>,
    max_messages: usize,
    wait_time: Duration,
}

impl QueueConsumer {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        max_messages: usize,
        wait_time: Duration,
    ) -> Self {
        Self {
            transport,
            max_messages,
            wait_time,
        }
    }

    /// Run one cycle: receive a batch, then process every group in it.
    pub async fn consume_once(&self, handler: &dyn GroupHandler) -> Result<ConsumeReport, Error> {
        let groups = self.receive_and_group().await?;
        self.process_groups(groups, handler).await
    }

    /// Perform one bounded receive and partition the batch by correlation key.
    pub async fn receive_and_group(&self) -> Result<Vec<MessageGroup>, QueueError> {
        debug!(
            queue = self.transport.queue_name(),
            max_messages = self.max_messages,
            wait_secs = self.wait_time.as_secs(),
            "Receiving messages"
        );

        let received = self
            .transport
            .receive(self.max_messages, self.wait_time)
            .await?;
        let message_count = received.len();
        let groups = group_messages(received);

        info!(
            queue = self.transport.queue_name(),
            messages = message_count,
            groups = groups.len(),
            "Received message groups"
        );

        Ok(groups)
    }

    /// Hand each group to `handler` in order and delete resolved groups.
    pub async fn process_groups(
        &self,
        groups: Vec<MessageGroup>,
        handler: &dyn GroupHandler,
    ) -> Result<ConsumeReport, Error> {
        let mut report = ConsumeReport {
            groups: groups.len(),
            ..ConsumeReport::default()
        };

        for group in &groups {
            let resolved = match handler.handle(group).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    error!(
                        group_id = %group.group_id,
                        error = %e,
                        "Group handler failed, leaving the rest of the batch for redelivery"
                    );
                    return Err(e);
                }
            };

            if !resolved {
                debug!(
                    group_id = %group.group_id,
                    messages = group.messages.len(),
                    "Group not resolved, leaving messages on the queue"
                );
                report.retained += 1;
                continue;
            }

            report.resolved += 1;
            let (deleted, failed) = self.delete_messages(&group.messages).await;
            report.deleted += deleted;
            report.delete_failures += failed;
        }

        Ok(report)
    }

    /// Delete each message independently. Returns (deleted, failed).
    async fn delete_messages(&self, messages: &[Message]) -> (usize, usize) {
        let mut deleted = 0;
        let mut failed = 0;

        for message in messages {
            match self.transport.delete(&message.delete_handle).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(
                        queue = self.transport.queue_name(),
                        error = %e,
                        "Failed to delete message, it will be redelivered"
                    );
                    failed += 1;
                }
            }
        }

        debug!(deleted, failed, "Deleted group messages");
        (deleted, failed)
    }
}

/// Partition a batch by correlation key.
///
/// Groups appear in first-seen order and keep arrival order internally.
/// A missing correlation key groups under `""`.
pub fn group_messages(received: Vec<ReceivedMessage>) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for message in received {
        let key = message.correlation_key.clone().unwrap_or_default();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(MessageGroup::new(key));
            groups.len() - 1
        });
        groups[slot].messages.push(Message::from(message));
    }

    groups
}
