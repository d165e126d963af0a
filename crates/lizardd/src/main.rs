//! lizardd - LizardFS Docker volume plugin daemon.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lizard_volume::{LizardMounter, VolumeDriver};
use lizardd::cli::Args;
use lizardd::daemon;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(args.log_filter())
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    tracing::info!("Starting up LizardFS volume plugin");

    let config = args.to_config();
    tracing::debug!(?config, "Loaded configuration");

    let mounter = Arc::new(LizardMounter::from_config(&config));
    let listener = daemon::bind(&config.socket_path()).await?;
    let driver = lizard_volume::shared(VolumeDriver::new(config, mounter));

    let report = daemon::run(driver, listener, daemon::shutdown_signal()).await?;
    if !report.is_clean() {
        tracing::warn!(
            failed = ?report.failed,
            root_unmounted = ?report.root_unmounted,
            "Some mounts could not be released"
        );
    }

    Ok(())
}
