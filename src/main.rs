use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tabserve::config::ServiceConfig;
use tabserve::engine::CsvEngine;
use tabserve::server::ApiServer;
use tabserve::session::SessionManager;
use tracing_subscriber::EnvFilter;

/// CSV processing service with pluggable tabular operations
#[derive(Parser)]
#[command(name = "tabserve")]
#[command(about = "Upload CSV files, run registered tabular operations, download the results", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = tabserve::config::DEFAULT_PORT)]
    port: u16,

    /// Root directory for staged uploads and collected outputs
    #[arg(long, default_value = "data")]
    data_root: PathBuf,

    /// Maximum total upload size per request, in mebibytes
    #[arg(long, default_value_t = 200)]
    max_upload_mb: u64,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("tabserve={default_level}"))),
        )
        .init();

    let mut config = ServiceConfig::with_data_root(cli.data_root);
    config.port = cli.port;
    config.max_upload_bytes = cli.max_upload_mb * 1024 * 1024;
    config.ensure_dirs()?;

    let loader = Arc::new(CsvEngine::new(&config.shared_root));
    let manager = Arc::new(SessionManager::new(config.clone(), loader));

    ApiServer::new(&config, manager).start().await
}
