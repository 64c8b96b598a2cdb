//! Shared types for queue consumption.

/// A message handed out by the transport, before grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Raw message body.
    pub body: String,
    /// Opaque token used to delete the message.
    pub delete_handle: String,
    /// Correlation attribute (`MessageGroupId`), if the transport set one.
    pub correlation_key: Option<String>,
}

/// A single queued message inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub delete_handle: String,
}

impl From<ReceivedMessage> for Message {
    fn from(received: ReceivedMessage) -> Self {
        Self {
            text: received.body,
            delete_handle: received.delete_handle,
        }
    }
}

/// Messages from one receive batch that share a correlation key.
///
/// The correlation key is the workflow task ID. Messages keep arrival order,
/// and the last one carries the freshest copy of the task's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    pub group_id: String,
    pub messages: Vec<Message>,
}

impl MessageGroup {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            messages: Vec::new(),
        }
    }

    /// The authoritative message of the group.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Outcome of one consume cycle, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    /// Groups received in the batch.
    pub groups: usize,
    /// Groups the handler marked as resolved.
    pub resolved: usize,
    /// Groups left on the queue for redelivery.
    pub retained: usize,
    /// Messages deleted from the queue.
    pub deleted: usize,
    /// Deletions that failed (the message will be redelivered).
    pub delete_failures: usize,
}
