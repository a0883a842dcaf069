pub mod processor;
pub mod queue;
pub mod runtime;
pub mod transfer;
pub mod worker;

pub use processor::mover::{MessageMover, TransferSummary};
pub use queue::client::{QueueClient, QueueClientFactory, QueueError};
pub use queue::memory::MemoryBroker;
pub use queue::message::{AttributeValue, Message, MessageAttributes};
pub use queue::options::ReceiveOptions;
pub use queue::sqs::{SqsClientFactory, SqsQueueClient};
pub use runtime::config::{MoverConfig, MoverConfigBuilder, MoverConfigParams};
pub use runtime::fatal::FatalErrorHandler;
pub use runtime::runner::Runner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use transfer::filter::Filter;
pub use transfer::limit::{MovedCounter, TransferLimit};
pub use transfer::pipeline::{transfer_message, PipelineOutcome, TransferContext};
pub use worker::{Worker, WorkerExit};
