use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::support::helpers::{broker_with, config, factory, init_tracing, sorted, DST, SRC};
use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;
use sqsmv::{
    AttributeValue, MemoryBroker, Message, MessageAttributes, MessageMover, QueueClient,
    QueueClientFactory, QueueError, ReceiveOptions, TransferLimit, TransferSummary,
};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

async fn run_mover(
    broker: &MemoryBroker,
    clients: usize,
    limit: TransferLimit,
    include: &str,
) -> Result<TransferSummary> {
    let mover = MessageMover::new(config(clients, limit, include)?, factory(broker));
    timeout(Duration::from_secs(5), mover.run())
        .await
        .context("transfer should finish")?
}

#[tokio::test]
async fn moves_every_message_with_a_single_client() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b", "c"])?;

    let summary = run_mover(&broker, 1, TransferLimit::UNBOUNDED, "").await?;

    assert_eq!(summary.moved, 3);
    assert_eq!(summary.received, 3);
    assert_eq!(summary.workers, 1);
    assert!(!summary.interrupted);
    assert!(broker.is_empty(SRC));
    assert_eq!(sorted(broker.bodies(DST)), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn include_pattern_leaves_unmatched_messages_on_source() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["keep-1", "skip-2", "keep-3"])?;

    let summary = run_mover(&broker, 1, TransferLimit::UNBOUNDED, "keep").await?;

    assert_eq!(summary.moved, 2);
    assert_eq!(summary.filtered, 1);
    assert_eq!(sorted(broker.bodies(DST)), vec!["keep-1", "keep-3"]);
    assert_eq!(broker.bodies(SRC), vec!["skip-2"]);
    Ok(())
}

// current-thread runtime and a broker that never yields: the pipeline tasks of a
// batch run one after another, so the limit is exact only here
#[tokio::test]
async fn limit_stops_a_single_client_at_the_cap() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["1", "2", "3", "4", "5"])?;

    let summary = run_mover(&broker, 1, TransferLimit::at_most(2), "").await?;

    assert_eq!(summary.moved, 2);
    assert_eq!(summary.skipped_for_limit, 3);
    assert_eq!(broker.len(DST), 2);
    assert_eq!(broker.len(SRC), 3);
    Ok(())
}

#[tokio::test]
async fn zero_limit_moves_nothing() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b"])?;

    let summary = run_mover(&broker, 3, TransferLimit::at_most(0), "").await?;

    assert_eq!(summary.moved, 0);
    assert_eq!(broker.receive_calls(), 0);
    assert_eq!(broker.send_calls(), 0);
    assert_eq!(broker.len(SRC), 2);
    Ok(())
}

#[tokio::test]
async fn empty_source_stops_each_worker_after_two_fetches() -> Result<()> {
    init_tracing();
    let broker = broker_with(&[])?;

    let summary = run_mover(&broker, 3, TransferLimit::UNBOUNDED, "").await?;

    assert_eq!(summary.moved, 0);
    assert_eq!(summary.fetches, 6);
    assert_eq!(summary.empty_fetches, 6);
    assert_eq!(broker.receive_calls(), 6);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_drain_the_source_exactly_once() -> Result<()> {
    init_tracing();
    let bodies: Vec<String> = (0..120).map(|i| format!("message-{i}")).collect();
    let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
    let broker = broker_with(&refs)?;

    let summary = run_mover(&broker, 4, TransferLimit::UNBOUNDED, "").await?;

    assert_eq!(summary.moved, 120);
    assert_eq!(summary.workers, 4);
    assert!(broker.is_empty(SRC));
    let forwarded: HashSet<String> = broker.bodies(DST).into_iter().collect();
    assert_eq!(forwarded.len(), 120);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn limit_across_clients_is_approximate_but_bounded() -> Result<()> {
    init_tracing();
    let bodies: Vec<String> = (0..200).map(|i| format!("m{i}")).collect();
    let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
    let broker = broker_with(&refs)?;

    let summary = run_mover(&broker, 4, TransferLimit::at_most(15), "").await?;

    assert!(summary.moved >= 15, "moved {} < limit", summary.moved);
    // each worker can overshoot by at most one batch
    assert!(summary.moved < 15 + 4 * 10, "moved {}", summary.moved);
    assert_eq!(broker.len(DST) as u64, summary.moved);
    Ok(())
}

struct SlowSendClient {
    inner: MemoryBroker,
    latency: Duration,
}

impl QueueClient for SlowSendClient {
    fn receive<'a>(
        &'a self,
        queue: &'a str,
        options: &'a ReceiveOptions,
    ) -> BoxFuture<'a, Result<Vec<Message>>> {
        self.inner.receive(queue, options)
    }

    fn send<'a>(
        &'a self,
        queue: &'a str,
        body: &'a str,
        attributes: &'a MessageAttributes,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            self.inner.send(queue, body, attributes).await
        })
    }

    fn delete<'a>(&'a self, queue: &'a str, receipt_handle: &'a str) -> BoxFuture<'a, Result<()>> {
        self.inner.delete(queue, receipt_handle)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_client_overshoots_by_at_most_one_batch_when_sends_are_slow() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["1", "2", "3", "4", "5"])?;
    let inner = broker.clone();
    let factory: Arc<dyn QueueClientFactory> =
        Arc::new(move |_worker_id: usize| -> Result<Arc<dyn QueueClient>> {
            Ok(Arc::new(SlowSendClient {
                inner: inner.clone(),
                latency: Duration::from_millis(20),
            }))
        });

    let mover = MessageMover::new(config(1, TransferLimit::at_most(2), "")?, factory);
    let summary = timeout(Duration::from_secs(5), mover.run())
        .await
        .context("transfer should finish")??;

    // every pipeline of the batch may pass the limit check before any send lands
    assert!(summary.moved >= 2, "moved {} < limit", summary.moved);
    assert!(summary.moved <= 5, "moved {}", summary.moved);
    assert_eq!(summary.moved + summary.skipped_for_limit, 5);
    assert_eq!(broker.len(DST) as u64, summary.moved);
    assert_eq!(broker.len(SRC) as u64, 5 - summary.moved);
    // the limit was reached inside the first batch, so no second fetch happens
    assert_eq!(broker.receive_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn send_failures_leave_messages_on_source() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b", "c"])?;
    broker.fail_send_of("b");

    let summary = run_mover(&broker, 1, TransferLimit::UNBOUNDED, "").await?;

    assert_eq!(summary.moved, 2);
    assert_eq!(summary.send_failures, 1);
    assert_eq!(broker.bodies(SRC), vec!["b"]);
    assert_eq!(sorted(broker.bodies(DST)), vec!["a", "c"]);
    Ok(())
}

#[tokio::test]
async fn delete_failures_still_count_the_move() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b", "c"])?;
    broker.fail_delete_of("b");

    let summary = run_mover(&broker, 1, TransferLimit::UNBOUNDED, "").await?;

    assert_eq!(summary.moved, 3);
    assert_eq!(summary.delete_failures, 1);
    assert_eq!(broker.bodies(SRC), vec!["b"]);
    assert_eq!(sorted(broker.bodies(DST)), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn message_attributes_are_forwarded_unchanged() -> Result<()> {
    init_tracing();
    let broker = broker_with(&[])?;
    let mut attributes = MessageAttributes::new();
    attributes.insert("tenant".into(), AttributeValue::string("acme"));
    attributes.insert("attempt".into(), AttributeValue::number(3));
    attributes.insert("digest".into(), AttributeValue::binary(vec![0xde, 0xad]));
    broker.push(SRC, "with-attributes", attributes.clone())?;

    let summary = run_mover(&broker, 1, TransferLimit::UNBOUNDED, "").await?;

    assert_eq!(summary.moved, 1);
    let forwarded = broker
        .attributes_of(DST, "with-attributes")
        .context("message should reach the destination")?;
    assert_eq!(forwarded, attributes);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn receive_failure_aborts_the_transfer() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b"])?;
    broker.fail_receives(SRC);

    let mover = MessageMover::new(config(3, TransferLimit::UNBOUNDED, "")?, factory(&broker));
    let err = timeout(Duration::from_secs(5), mover.run())
        .await
        .context("transfer should stop after the receive failure")?
        .expect_err("receive failure must abort the transfer");

    let message = format!("{err:#}");
    assert!(
        message.contains("message transfer aborted"),
        "unexpected error: {message}"
    );
    assert!(message.contains("failed to receive messages"), "{message}");
    assert!(err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<QueueError>(), Some(QueueError::Receive { .. }))));
    assert_eq!(broker.send_calls(), 0);
    assert_eq!(broker.len(SRC), 2);
    Ok(())
}

#[tokio::test]
async fn client_factory_failure_starts_no_workers() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a"])?;
    let inner = broker.clone();
    let factory: Arc<dyn QueueClientFactory> =
        Arc::new(move |worker_id: usize| -> Result<Arc<dyn QueueClient>> {
            if worker_id == 1 {
                bail!("no credentials for worker {worker_id}");
            }
            Ok(Arc::new(inner.clone()))
        });

    let mover = MessageMover::new(config(2, TransferLimit::UNBOUNDED, "")?, factory);
    let err = mover.run().await.expect_err("factory failure must surface");

    let message = format!("{err:#}");
    assert!(message.contains("failed to create queue client for worker 1"), "{message}");
    assert_eq!(broker.receive_calls(), 0);
    Ok(())
}

struct PanickingClient;

impl QueueClient for PanickingClient {
    fn receive<'a>(
        &'a self,
        _queue: &'a str,
        _options: &'a ReceiveOptions,
    ) -> BoxFuture<'a, Result<Vec<Message>>> {
        panic!("receive exploded");
    }

    fn send<'a>(
        &'a self,
        _queue: &'a str,
        _body: &'a str,
        _attributes: &'a MessageAttributes,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn delete<'a>(&'a self, _queue: &'a str, _receipt_handle: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[tokio::test]
async fn worker_panic_aborts_the_transfer() -> Result<()> {
    init_tracing();
    let factory: Arc<dyn QueueClientFactory> =
        Arc::new(|_worker_id: usize| -> Result<Arc<dyn QueueClient>> {
            Ok(Arc::new(PanickingClient))
        });

    let mover = MessageMover::new(config(1, TransferLimit::UNBOUNDED, "")?, factory);
    let err = mover.run().await.expect_err("panic must surface as an error");

    let message = format!("{err:#}");
    assert!(message.contains("worker 0 panicked: receive exploded"), "{message}");
    Ok(())
}

#[tokio::test]
async fn cancelled_root_token_interrupts_the_transfer() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b"])?;
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let mover = MessageMover::with_cancellation_token(
        config(2, TransferLimit::UNBOUNDED, "")?,
        factory(&broker),
        shutdown,
    );
    let summary = mover.run().await?;

    assert!(summary.interrupted);
    assert_eq!(summary.moved, 0);
    assert_eq!(broker.len(SRC), 2);
    Ok(())
}
