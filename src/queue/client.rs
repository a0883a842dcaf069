//! Queue client seam consumed by workers. Houses the `QueueClient` trait, the
//! factory that hands each worker its own client, and the error kinds clients
//! report so callers can tell receive, send and delete failures apart.

use crate::queue::message::{Message, MessageAttributes};
use crate::queue::options::ReceiveOptions;
use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    Receive { queue: String, reason: String },
    Send { queue: String, reason: String },
    Delete { queue: String, reason: String },
    UnknownQueue { queue: String },
    InvalidReceipt { receipt_handle: String },
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Receive { queue, reason } => {
                write!(f, "failed to receive from {queue}: {reason}")
            }
            QueueError::Send { queue, reason } => {
                write!(f, "failed to send to {queue}: {reason}")
            }
            QueueError::Delete { queue, reason } => {
                write!(f, "failed to delete from {queue}: {reason}")
            }
            QueueError::UnknownQueue { queue } => write!(f, "queue {queue} does not exist"),
            QueueError::InvalidReceipt { receipt_handle } => {
                write!(f, "receipt handle {receipt_handle} is not valid")
            }
        }
    }
}

impl std::error::Error for QueueError {}

/// Operations the transfer engine needs from a queue service.
///
/// Implementations must be safe to share between the pipeline tasks of one worker.
pub trait QueueClient: Send + Sync {
    fn receive<'a>(
        &'a self,
        queue: &'a str,
        options: &'a ReceiveOptions,
    ) -> BoxFuture<'a, Result<Vec<Message>>>;

    fn send<'a>(
        &'a self,
        queue: &'a str,
        body: &'a str,
        attributes: &'a MessageAttributes,
    ) -> BoxFuture<'a, Result<()>>;

    fn delete<'a>(&'a self, queue: &'a str, receipt_handle: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Builds one independent, already-authenticated client per worker.
pub trait QueueClientFactory: Send + Sync {
    fn create(&self, worker_id: usize) -> Result<Arc<dyn QueueClient>>;
}

impl<F> QueueClientFactory for F
where
    F: Fn(usize) -> Result<Arc<dyn QueueClient>> + Send + Sync,
{
    fn create(&self, worker_id: usize) -> Result<Arc<dyn QueueClient>> {
        self(worker_id)
    }
}
