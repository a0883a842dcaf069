//! Per-message transfer: filter, limit re-check, forward to the destination,
//! count, then acknowledge on the source.
//!
//! Every step may end the transfer of that one message. Nothing is retried here;
//! a message that is not acknowledged becomes visible again on the source once its
//! visibility timeout lapses.

use crate::queue::client::QueueClient;
use crate::queue::message::Message;
use crate::runtime::telemetry::Telemetry;
use crate::transfer::filter::Filter;
use crate::transfer::limit::{MovedCounter, TransferLimit};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Body did not match the filter; message left untouched on the source.
    Filtered,
    /// Limit already reached; message left untouched on the source.
    SkippedForLimit,
    /// Destination send failed; message will be redelivered from the source.
    SendFailed,
    Moved,
    /// Forwarded and counted, but the source delete failed (possible duplicate).
    MovedUnacknowledged,
}

impl PipelineOutcome {
    pub fn forwarded(&self) -> bool {
        matches!(self, Self::Moved | Self::MovedUnacknowledged)
    }
}

/// Everything one pipeline invocation needs, cheap to clone into a spawned task.
#[derive(Clone)]
pub struct TransferContext {
    pub client: Arc<dyn QueueClient>,
    pub source: Arc<str>,
    pub destination: Arc<str>,
    pub filter: Arc<Filter>,
    pub limit: TransferLimit,
    pub moved: Arc<MovedCounter>,
    pub telemetry: Arc<Telemetry>,
}

impl TransferContext {
    pub fn limit_reached(&self) -> bool {
        self.moved.limit_reached(self.limit)
    }
}

pub async fn transfer_message(
    ctx: &TransferContext,
    worker_id: usize,
    message: Message,
) -> PipelineOutcome {
    if !ctx.filter.matches(message.body()) {
        ctx.telemetry.record_filtered();
        tracing::trace!(
            worker = worker_id,
            message_id = message.message_id.as_deref(),
            "message excluded by filter"
        );
        return PipelineOutcome::Filtered;
    }

    if ctx.limit_reached() {
        ctx.telemetry.record_limit_skip();
        return PipelineOutcome::SkippedForLimit;
    }

    if let Err(err) = ctx
        .client
        .send(&ctx.destination, message.body(), &message.attributes)
        .await
    {
        ctx.telemetry.record_send_failure();
        tracing::error!(
            worker = worker_id,
            message_id = message.message_id.as_deref(),
            error = %err,
            "failed to send message to destination"
        );
        return PipelineOutcome::SendFailed;
    }

    ctx.moved.record_moved();

    if let Err(err) = ctx
        .client
        .delete(&ctx.source, message.receipt_handle())
        .await
    {
        ctx.telemetry.record_delete_failure();
        tracing::error!(
            worker = worker_id,
            receipt_handle = message.receipt_handle(),
            error = %err,
            "failed to delete forwarded message from source"
        );
        return PipelineOutcome::MovedUnacknowledged;
    }

    PipelineOutcome::Moved
}
