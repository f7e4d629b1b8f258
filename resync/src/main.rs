use std::env;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use resync::{Dependencies, ResyncConfig, ResyncError};
use resync_pipeline::SyncListeners;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), ResyncError> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = ResyncConfig::from_env()?;
    let dependencies = Dependencies::new(&config).await?;

    let stream = dependencies
        .synchronizer
        .synchronize(config.filter.clone(), config.sync_config());

    let canceller = stream.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            canceller.cancel();
        }
    });

    let summary = stream
        .drive(SyncListeners::new().on_error(|failure| {
            warn!(record_id = ?failure.record_id, error = %failure.cause, "Record not synchronized");
        }))
        .await;

    if let Err(e) = summary.ensure_complete() {
        error!(error = %e, pulled = summary.pulled, "Synchronization did not complete");
        return Err(e.into());
    }
    Ok(())
}
