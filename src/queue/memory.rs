//! In-memory queue service with receipt handles, visibility timeouts and fault
//! injection. Workers can be pointed at a `MemoryBroker` in place of SQS, which
//! is how the transfer engine is exercised in isolation.

use crate::queue::client::{QueueClient, QueueClientFactory, QueueError};
use crate::queue::message::{Message, MessageAttributes};
use crate::queue::options::ReceiveOptions;
use anyhow::Result;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: String,
    attributes: MessageAttributes,
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
}

impl StoredMessage {
    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.map_or(true, |until| until <= now)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<StoredMessage>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_receives: HashSet<String>,
    fail_send_bodies: HashSet<String>,
    fail_delete_bodies: HashSet<String>,
}

#[derive(Debug)]
struct BrokerInner {
    queues: Mutex<HashMap<String, QueueState>>,
    faults: Mutex<Faults>,
    default_visibility: Duration,
    next_id: AtomicU64,
    receive_calls: AtomicUsize,
    send_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

/// Shared handle to a set of named in-memory queues.
///
/// Cloning is cheap; every clone observes the same queues.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_default_visibility(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_default_visibility(default_visibility: Duration) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                queues: Mutex::new(HashMap::new()),
                faults: Mutex::new(Faults::default()),
                default_visibility,
                next_id: AtomicU64::new(1),
                receive_calls: AtomicUsize::new(0),
                send_calls: AtomicUsize::new(0),
                delete_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn create_queue(&self, queue: impl Into<String>) {
        self.lock_queues().entry(queue.into()).or_default();
    }

    /// Appends a message without going through the client interface.
    pub fn push(
        &self,
        queue: &str,
        body: impl Into<String>,
        attributes: MessageAttributes,
    ) -> Result<()> {
        let message_id = self.next_token("msg");
        let mut queues = self.lock_queues();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::UnknownQueue {
                queue: queue.to_owned(),
            })?;
        state.messages.push_back(StoredMessage {
            message_id,
            body: body.into(),
            attributes,
            receipt_handle: None,
            invisible_until: None,
        });
        Ok(())
    }

    pub fn push_bodies<I, S>(&self, queue: &str, bodies: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for body in bodies {
            self.push(queue, body, MessageAttributes::new())?;
        }
        Ok(())
    }

    /// Number of messages stored in the queue, visible or not.
    pub fn len(&self, queue: &str) -> usize {
        self.lock_queues()
            .get(queue)
            .map_or(0, |state| state.messages.len())
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Bodies of every stored message in insertion order.
    pub fn bodies(&self, queue: &str) -> Vec<String> {
        self.lock_queues().get(queue).map_or_else(Vec::new, |state| {
            state.messages.iter().map(|m| m.body.clone()).collect()
        })
    }

    pub fn attributes_of(&self, queue: &str, body: &str) -> Option<MessageAttributes> {
        self.lock_queues().get(queue).and_then(|state| {
            state
                .messages
                .iter()
                .find(|m| m.body == body)
                .map(|m| m.attributes.clone())
        })
    }

    /// Makes every in-flight message of the queue visible again.
    pub fn expire_visibility(&self, queue: &str) {
        if let Some(state) = self.lock_queues().get_mut(queue) {
            for message in state.messages.iter_mut() {
                message.invisible_until = None;
                message.receipt_handle = None;
            }
        }
    }

    pub fn fail_receives(&self, queue: impl Into<String>) {
        self.lock_faults().fail_receives.insert(queue.into());
    }

    pub fn fail_send_of(&self, body: impl Into<String>) {
        self.lock_faults().fail_send_bodies.insert(body.into());
    }

    pub fn fail_delete_of(&self, body: impl Into<String>) {
        self.lock_faults().fail_delete_bodies.insert(body.into());
    }

    pub fn receive_calls(&self) -> usize {
        self.inner.receive_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.inner.send_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.inner.delete_calls.load(Ordering::SeqCst)
    }

    fn next_token(&self, prefix: &str) -> String {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{id}")
    }

    fn lock_queues(&self) -> std::sync::MutexGuard<'_, HashMap<String, QueueState>> {
        self.inner
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn receive_now(&self, queue: &str, options: &ReceiveOptions) -> Result<Vec<Message>> {
        self.inner.receive_calls.fetch_add(1, Ordering::SeqCst);
        options.validate()?;

        if self.lock_faults().fail_receives.contains(queue) {
            return Err(QueueError::Receive {
                queue: queue.to_owned(),
                reason: "injected receive failure".to_owned(),
            }
            .into());
        }

        let visibility = options
            .visibility_timeout
            .unwrap_or(self.inner.default_visibility);
        let now = Instant::now();
        let mut queues = self.lock_queues();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::UnknownQueue {
                queue: queue.to_owned(),
            })?;

        let mut delivered = Vec::new();
        for stored in state.messages.iter_mut() {
            if delivered.len() >= options.max_messages {
                break;
            }
            if !stored.is_visible(now) {
                continue;
            }
            let receipt_handle = self.next_token("rh");
            stored.invisible_until = Some(now + visibility);
            stored.receipt_handle = Some(receipt_handle.clone());

            let attributes = if options.requests_all_attributes() {
                stored.attributes.clone()
            } else {
                stored
                    .attributes
                    .iter()
                    .filter(|(name, _)| options.attribute_names.contains(name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            };

            delivered.push(Message {
                message_id: Some(stored.message_id.clone()),
                body: stored.body.clone(),
                attributes,
                receipt_handle,
            });
        }

        Ok(delivered)
    }

    fn send_now(&self, queue: &str, body: &str, attributes: &MessageAttributes) -> Result<()> {
        self.inner.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.lock_faults().fail_send_bodies.contains(body) {
            return Err(QueueError::Send {
                queue: queue.to_owned(),
                reason: "injected send failure".to_owned(),
            }
            .into());
        }
        self.push(queue, body, attributes.clone())
    }

    fn delete_now(&self, queue: &str, receipt_handle: &str) -> Result<()> {
        self.inner.delete_calls.fetch_add(1, Ordering::SeqCst);
        let faults = self.lock_faults();
        let mut queues = self.lock_queues();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::UnknownQueue {
                queue: queue.to_owned(),
            })?;

        let position = state
            .messages
            .iter()
            .position(|m| m.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| QueueError::InvalidReceipt {
                receipt_handle: receipt_handle.to_owned(),
            })?;

        if faults.fail_delete_bodies.contains(&state.messages[position].body) {
            return Err(QueueError::Delete {
                queue: queue.to_owned(),
                reason: "injected delete failure".to_owned(),
            }
            .into());
        }

        state.messages.remove(position);
        Ok(())
    }
}

impl QueueClient for MemoryBroker {
    fn receive<'a>(
        &'a self,
        queue: &'a str,
        options: &'a ReceiveOptions,
    ) -> BoxFuture<'a, Result<Vec<Message>>> {
        Box::pin(async move { self.receive_now(queue, options) })
    }

    fn send<'a>(
        &'a self,
        queue: &'a str,
        body: &'a str,
        attributes: &'a MessageAttributes,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.send_now(queue, body, attributes) })
    }

    fn delete<'a>(&'a self, queue: &'a str, receipt_handle: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.delete_now(queue, receipt_handle) })
    }
}

impl QueueClientFactory for MemoryBroker {
    fn create(&self, _worker_id: usize) -> Result<Arc<dyn QueueClient>> {
        Ok(Arc::new(self.clone()))
    }
}
