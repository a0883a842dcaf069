use crate::queue::client::QueueClient;
use crate::queue::options::ReceiveOptions;
use crate::runtime::telemetry::Telemetry;
use crate::transfer::filter::Filter;
use crate::transfer::limit::{MovedCounter, TransferLimit};
use crate::transfer::pipeline::TransferContext;
use std::sync::Arc;

/// State every worker of one run shares. The moved counter is the only piece
/// that gates behaviour; everything else is read-only or telemetry.
#[derive(Clone)]
pub struct WorkerShared {
    pub(super) source: Arc<str>,
    pub(super) destination: Arc<str>,
    pub(super) filter: Arc<Filter>,
    pub(super) limit: TransferLimit,
    pub(super) moved: Arc<MovedCounter>,
    pub(super) telemetry: Arc<Telemetry>,
    pub(super) receive_options: Arc<ReceiveOptions>,
}

pub struct WorkerSharedParams {
    pub source: String,
    pub destination: String,
    pub filter: Arc<Filter>,
    pub limit: TransferLimit,
    pub moved: Arc<MovedCounter>,
    pub telemetry: Arc<Telemetry>,
    pub receive_options: ReceiveOptions,
}

impl WorkerShared {
    pub fn new(params: WorkerSharedParams) -> Self {
        Self {
            source: Arc::from(params.source),
            destination: Arc::from(params.destination),
            filter: params.filter,
            limit: params.limit,
            moved: params.moved,
            telemetry: params.telemetry,
            receive_options: Arc::new(params.receive_options),
        }
    }

    pub(super) fn transfer_context(&self, client: Arc<dyn QueueClient>) -> TransferContext {
        TransferContext {
            client,
            source: Arc::clone(&self.source),
            destination: Arc::clone(&self.destination),
            filter: Arc::clone(&self.filter),
            limit: self.limit,
            moved: Arc::clone(&self.moved),
            telemetry: Arc::clone(&self.telemetry),
        }
    }
}
