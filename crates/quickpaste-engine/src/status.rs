use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{info, trace};

/// Progress and lifecycle events published by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// A sequence started playing.
    Running {
        /// Normalized combo that triggered it.
        key: String,
    },
    /// A sequence finished.
    Idle {
        /// Normalized combo that triggered it.
        key: String,
        /// Number of steps that failed and were skipped.
        failed_steps: usize,
    },
    /// Hooks were re-armed from the table.
    Reloaded {
        /// Number of hooks now armed.
        armed: usize,
    },
    /// Hooks were suspended.
    Paused,
    /// Hooks were re-armed after a pause.
    Resumed,
}

/// Receiving half of the status stream.
pub type StatusReceiver = UnboundedReceiver<Status>;

/// Publishes [`Status`] events without ever blocking the sender.
#[derive(Clone)]
pub struct StatusDispatcher {
    /// Channel to the status consumer.
    tx: UnboundedSender<Status>,
}

impl StatusDispatcher {
    /// Create a new dispatcher from a status channel.
    pub fn new(tx: UnboundedSender<Status>) -> Self {
        Self { tx }
    }

    /// Send an event; a dropped receiver is tolerated.
    pub fn send(&self, status: Status) {
        match &status {
            Status::Idle { key, failed_steps } if *failed_steps > 0 => {
                info!(%key, failed_steps, "sequence_finished_with_failures");
            }
            _ => trace!(?status, "status"),
        }
        if self.tx.send(status).is_err() {
            trace!("status_receiver_dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn send_delivers_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let d = StatusDispatcher::new(tx);
        d.send(Status::Paused);
        d.send(Status::Resumed);
        assert_eq!(rx.try_recv().ok(), Some(Status::Paused));
        assert_eq!(rx.try_recv().ok(), Some(Status::Resumed));
    }

    #[test]
    fn dropped_receiver_is_tolerated() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        StatusDispatcher::new(tx).send(Status::Reloaded { armed: 3 });
    }
}
