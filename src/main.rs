//! remote-edit server
//!
//! Listens on a Unix socket and lets clients append to, clear, or ping a
//! single shared target file.
//!
//! Configuration via CLI arguments or TOML file.

use remote_edit::config::Config;
use remote_edit::server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        socket = %config.socket_path.display(),
        file = %config.file_path.display(),
        "Starting remote-edit server"
    );

    let server = Server::bind(&config)?;
    server.run().await?;
    Ok(())
}
