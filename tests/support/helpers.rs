use std::sync::{Arc, OnceLock};

use anyhow::Result;
use sqsmv::{MemoryBroker, MoverConfig, QueueClientFactory, TransferLimit};
use tracing_subscriber::EnvFilter;

pub const SRC: &str = "https://sqs.local/000000000000/source";
pub const DST: &str = "https://sqs.local/000000000000/destination";

static TRACING_SUBSCRIBER: OnceLock<()> = OnceLock::new();

pub fn init_tracing() {
    TRACING_SUBSCRIBER.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Broker with an empty destination and a source holding `bodies` in order.
pub fn broker_with(bodies: &[&str]) -> Result<MemoryBroker> {
    let broker = MemoryBroker::new();
    broker.create_queue(SRC);
    broker.create_queue(DST);
    broker.push_bodies(SRC, bodies.iter().copied())?;
    Ok(broker)
}

pub fn config(clients: usize, limit: TransferLimit, include: &str) -> Result<MoverConfig> {
    MoverConfig::builder()
        .source_queue(SRC)
        .destination_queue(DST)
        .client_count(clients)
        .limit(limit)
        .include_pattern(include)
        .build()
}

pub fn factory(broker: &MemoryBroker) -> Arc<dyn QueueClientFactory> {
    Arc::new(broker.clone())
}

pub fn sorted(mut bodies: Vec<String>) -> Vec<String> {
    bodies.sort();
    bodies
}
