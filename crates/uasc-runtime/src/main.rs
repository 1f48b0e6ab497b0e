use anyhow::{Context, Result};
use tokio::io::{stdin, stdout, BufReader};
use tracing::info;
use uasc_runtime::{Runtime, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from the optional file and environment variables
    let config = RuntimeConfig::load().context("Failed to load configuration")?;

    uasc_monitoring::init(&config.monitoring()).context("Failed to initialize monitoring")?;

    let runtime = Runtime::from_config(config).context("Failed to start runtime")?;

    let processed = runtime
        .run_lines(BufReader::new(stdin()), stdout())
        .await
        .context("Runtime error")?;

    let snapshot = runtime.metrics().snapshot();
    info!(
        processed,
        success = snapshot.success,
        failed = snapshot.failed,
        rejected = snapshot.rejected,
        "Shutting down"
    );

    Ok(())
}
