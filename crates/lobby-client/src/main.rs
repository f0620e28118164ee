//! Lobby demo client entry point
//!
//! Run with:
//! ```bash
//! cargo run -p lobby-client
//! ```
//!
//! Configuration is loaded from environment variables (`LOBBY_*`, `RUST_LOG`).

use lobby_client::ClientOptions;
use lobby_common::{try_init_tracing_with_config, SyncConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout belongs to the conversation
    let tracing = TracingConfig::interactive().with_env_overrides();
    if let Err(e) = try_init_tracing_with_config(tracing) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Client failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = SyncConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    let options = ClientOptions::from_env();

    info!(
        user_id = %options.user_id,
        history_limit = config.history_limit,
        "Configuration loaded"
    );

    let exit = lobby_client::run(config, options).await?;
    info!(?exit, "Client stopped");
    println!("bye");

    Ok(())
}
