use clap::Parser;
use georocket_import::cli::{run, Cli};
use georocket_import::error::ImportError;
use georocket_import::report::ConsoleReporter;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load environment
    dotenvy::dotenv().ok();

    // stdout is reserved for progress lines
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    match run(cli, &ConsoleReporter).await {
        Ok(summary) => {
            tracing::info!(files = summary.succeeded, "CLI completed successfully");
            std::process::exit(summary.exit_code());
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            let code = e.downcast_ref::<ImportError>().map_or(1, ImportError::exit_code);
            std::process::exit(code);
        }
    }
}
