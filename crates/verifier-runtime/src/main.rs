//! # RainBlock Verifier Node
//!
//! Entry point: initialize logging, load the configuration named on the
//! command line, and run the node until interrupted.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use verifier_runtime::{run_node, VerifierConfig, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("===========================================");
    info!("  {}", VERSION);
    info!("===========================================");

    let config_path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("verifier.toml"));
    let config = VerifierConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    run_node(config).await
}
