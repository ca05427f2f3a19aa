//! shapepipe CLI entrypoint

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shapepipe::cli::Cli;
use shapepipe::error::PipelineError;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Parse and execute CLI
    let cli = Cli::parse();
    if let Err(err) = cli.execute().await {
        tracing::error!("{err:#}");
        let code = err
            .downcast_ref::<PipelineError>()
            .map(PipelineError::exit_code)
            .unwrap_or(2);
        std::process::exit(code);
    }
}
