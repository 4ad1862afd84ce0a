use kolam::{Bridge, Config};

use log::{info, warn};
use tokio::signal::unix::{signal, SignalKind};

type ErasedError = Box<dyn std::error::Error + Send + Sync + 'static>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), ErasedError> {
    pretty_env_logger::init_timed();

    info!("kolam version {VERSION}");

    let config = Config::from_env()?;
    let mut bridge = Bridge::init(config).await?;

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = bridge.run() => { warn!("mqtt session ended") },
        _ = sigterm.recv() => { info!("got SIGTERM, exiting...") },
        _ = tokio::signal::ctrl_c() => { info!("got SIGINT, exiting...") },
    };

    if bridge.shutdown().await {
        info!("all writes finished");
    }

    Ok(())
}
