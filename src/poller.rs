//! Poll loop: runs consume cycles back to back with a fixed pause between
//! them until cancelled.
//!
//! State machine:
//! 1. `Running` while a cycle receives and processes one batch
//! 2. `Waiting` for the poll interval once the cycle ends, whatever its outcome
//! 3. `Stopped` as soon as the cancellation token fires, aborting either of the
//!    above mid-flight

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::queue::{GroupHandler, QueueConsumer};

/// Observable state of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    Waiting,
    Stopped,
}

/// Drives a [`QueueConsumer`] with a [`GroupHandler`] forever.
pub struct PollLoop {
    consumer: QueueConsumer,
    handler: Arc<dyn GroupHandler>,
    interval: Duration,
    state: watch::Sender<PollState>,
}

impl PollLoop {
    /// The loop reports `Stopped` until [`run`](Self::run) starts.
    pub fn new(
        consumer: QueueConsumer,
        handler: Arc<dyn GroupHandler>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(PollState::Stopped);
        Self {
            consumer,
            handler,
            interval,
            state,
        }
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Run until `cancel` fires. Cycle errors are logged and never end the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Poll loop started");

        loop {
            self.state.send_replace(PollState::Running);

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.consumer.consume_once(self.handler.as_ref()) => match result {
                    Ok(report) => info!(
                        groups = report.groups,
                        resolved = report.resolved,
                        retained = report.retained,
                        deleted = report.deleted,
                        delete_failures = report.delete_failures,
                        "Poll cycle finished"
                    ),
                    Err(e) => error!(error = %e, "Poll cycle failed"),
                },
            }

            self.state.send_replace(PollState::Waiting);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state.send_replace(PollState::Stopped);
        info!("Poll loop stopped");
    }
}
