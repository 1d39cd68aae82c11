use magnetite::{app, bootstrap};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    let (config, crawler) = bootstrap::app::setup();

    let cancellation = CancellationToken::new();

    let jobs = app::start(&config, crawler, cancellation.clone()).await;

    // handle the signals
    tokio::signal::ctrl_c().await.expect("Failed to listen to shutdown signal.");

    info!("magnetite shutting down..");

    cancellation.cancel();

    for job in jobs {
        let _ = job.await;
    }

    info!("magnetite shut down gracefully");
}
