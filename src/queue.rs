//! Queue plumbing: the client seam workers talk to, message types, receive
//! options, and the SQS and in-memory implementations.

pub mod client;
pub mod memory;
pub mod message;
pub mod options;
pub mod sqs;

pub use client::{QueueClient, QueueClientFactory, QueueError};
pub use memory::MemoryBroker;
pub use message::{AttributeValue, Message, MessageAttributes};
pub use options::{ReceiveOptions, MAX_BATCH_SIZE};
pub use sqs::{SqsClientFactory, SqsQueueClient};
