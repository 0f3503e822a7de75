//! # Wallet Runtime
//!
//! Entry point: load configuration, boot the runtime, connect, and run until
//! Ctrl+C.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use wallet_runtime::{start_api, Collaborators, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.logging.level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  Wallet Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        state_key = %config.persistence.state_key,
        file_store = config.persistence.use_file_store,
        network = %config.network.default_network,
        "Configuration loaded"
    );

    let collaborators = Collaborators::from_config(&config);
    let main = start_api(config, collaborators)
        .await
        .context("Failed to boot wallet runtime")?;
    main.connect()
        .await
        .context("Failed to open network connection")?;

    info!("Wallet runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    main.shutdown().await.context("Unclean shutdown")?;
    Ok(())
}
