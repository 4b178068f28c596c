use anyhow::{Context, Result};
use docflow_monitoring::{init_logging, LogExt};
use docflow_runner::config::RunnerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment variables and arguments
    let config = RunnerConfig::load()
        .context("Failed to load configuration")?
        .with_args(std::env::args().skip(1));

    init_logging(&config.monitoring()).context("Failed to initialize logging")?;

    let outputs = docflow_runner::run(&config)
        .await
        .log_err("Pipeline run failed")
        .context("Run error")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&outputs).context("Failed to print outputs")?
    );
    Ok(())
}
