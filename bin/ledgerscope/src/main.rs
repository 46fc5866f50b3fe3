//! Entrypoint.

use clap::Parser;
use config::Opts;
use dotenvy::dotenv;
use driver::Driver;
use eyre::WrapErr;
use runtime::{ShutdownSignal, run_until_shutdown};
use tracing::{info, warn};
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // Try the default .env file, and ignore if it doesn't exist.
        dotenv().ok();
    }

    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("Ledgerscope starting...");

    let shutdown = ShutdownSignal::new().wrap_err("failed to install signal handlers")?;
    let run = async { Driver::new(opts).await?.start().await };

    match run_until_shutdown(run, shutdown).await {
        Some(report) => {
            let report = report?;
            info!(
                last_committed = ?report.last_committed,
                blocks = report.blocks_committed,
                "Ledgerscope finished"
            );
        }
        None => warn!("Ledgerscope interrupted, the in-flight block was not committed"),
    }
    Ok(())
}
