//! sqsmv CLI - move messages between SQS queues.

use anyhow::{Context, Result};
use clap::Parser;
use sqsmv::transfer::limit::UNBOUNDED_RAW;
use sqsmv::{init_tracing, MoverConfig, Runner, SqsClientFactory, TransferLimit};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "sqsmv")]
#[command(about = "Concurrently move messages from one SQS queue to another")]
#[command(version)]
struct Cli {
    /// Source queue URL
    #[arg(long)]
    src: String,

    /// Destination queue URL
    #[arg(long)]
    dest: String,

    /// Number of concurrent workers, each with its own client
    #[arg(long, default_value_t = 1)]
    clients: usize,

    /// Maximum number of messages to move; -1 moves everything
    #[arg(long, default_value_t = UNBOUNDED_RAW, allow_negative_numbers = true)]
    limit: i64,

    /// Only move messages whose body matches this regular expression
    #[arg(long, default_value = "")]
    include: String,

    /// Override the SQS endpoint (LocalStack, ElasticMQ)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// AWS region; defaults to the provider chain
    #[arg(long)]
    region: Option<String>,

    /// Seconds between runtime metrics log lines
    #[arg(long, default_value_t = 5)]
    metrics_interval_secs: u64,

    /// Print the final summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn mover_config(&self) -> Result<MoverConfig> {
        MoverConfig::builder()
            .source_queue(&self.src)
            .destination_queue(&self.dest)
            .client_count(self.clients)
            .limit(TransferLimit::from_raw(self.limit)?)
            .include_pattern(&self.include)
            .metrics_interval(Duration::from_secs(self.metrics_interval_secs))
            .build()
            .context("invalid arguments")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.mover_config()?;

    let factory =
        SqsClientFactory::from_env(cli.region.clone(), cli.endpoint_url.clone()).await;
    let runner = Runner::new(config, Arc::new(factory));
    let summary = runner.run_until_ctrl_c().await?;

    tracing::info!(
        moved = summary.moved,
        "all done, moved {} messages",
        summary.moved
    );

    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&summary).context("failed to render summary")?;
        println!("{rendered}");
    }

    Ok(())
}
