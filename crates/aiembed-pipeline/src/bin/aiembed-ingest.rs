use std::io;

use aiembed_client::cancel_pair;
use aiembed_pipeline::EmbedProcessor;
use aiembed_pipeline::ingest::{self, IngestConfig};
use tokio::io::{BufReader, BufWriter};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> io::Result<()> {
    // stdout carries documents; logs go to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = IngestConfig::from_env()?;
    let pipeline = config.load_pipeline()?;
    let processor = EmbedProcessor::from_config(&pipeline)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let (canceller, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight documents");
            canceller.cancel();
        }
    });

    let input = BufReader::new(tokio::io::stdin());
    let mut output = BufWriter::new(tokio::io::stdout());
    let stats = ingest::run(&processor, input, &mut output, config.concurrency, &cancel).await?;

    tracing::info!(
        documents = stats.documents,
        embedded = stats.embedded,
        skipped = stats.skipped,
        failed = stats.failed,
        invalid = stats.invalid,
        "ingest finished"
    );
    Ok(())
}
