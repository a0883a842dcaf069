use std::time::Duration;

use crate::support::helpers::{broker_with, config, factory, init_tracing, sorted, DST, SRC};
use anyhow::{Context, Result};
use sqsmv::{Runner, TransferLimit};
use tokio::time::timeout;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_returns_once_the_source_is_drained() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b", "c"])?;

    let runner = Runner::new(config(2, TransferLimit::UNBOUNDED, "")?, factory(&broker));
    let summary = timeout(Duration::from_secs(5), runner.run_until_ctrl_c())
        .await
        .context("runner should finish without a signal")??;

    assert_eq!(summary.moved, 3);
    assert!(!summary.interrupted);
    assert!(broker.is_empty(SRC));
    assert_eq!(sorted(broker.bodies(DST)), vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_exits_on_worker_failure() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a"])?;
    broker.fail_receives(SRC);

    let runner = Runner::new(config(2, TransferLimit::UNBOUNDED, "")?, factory(&broker));
    let outcome = timeout(Duration::from_secs(5), runner.run_until_ctrl_c())
        .await
        .context("runner should stop after worker failure")?;

    let err = outcome.expect_err("worker failure should abort runner");
    let message = format!("{err:#}");
    assert!(
        message.contains("message transfer aborted"),
        "runner did not propagate worker failure, got {message}"
    );
    assert!(runner.cancellation_token().is_cancelled());
    Ok(())
}

#[tokio::test]
async fn cancelling_the_runner_token_interrupts_workers() -> Result<()> {
    init_tracing();
    let broker = broker_with(&["a", "b"])?;

    let runner = Runner::new(config(1, TransferLimit::UNBOUNDED, "")?, factory(&broker));
    runner.cancellation_token().cancel();
    let summary = runner.run().await?;

    assert!(summary.interrupted);
    assert_eq!(summary.moved, 0);
    assert_eq!(broker.receive_calls(), 0);
    Ok(())
}
