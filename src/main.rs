//! snapmover CLI

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use snapmover::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    match cli.run().await {
        Ok(summary) => {
            info!(
                backup = %summary.run_id,
                contents = summary.contents,
                windows = summary.windows,
                jobs = summary.jobs_created.len(),
                failed = summary.jobs_failed.len(),
                total = ?summary.total_time,
                "Run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run aborted");
            ExitCode::FAILURE
        }
    }
}
