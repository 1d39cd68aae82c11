//! Job that runs the DHT crawl.
//!
//! The crawl owns its worker pool and drains it when the cancellation token
//! fires, so awaiting the returned handle after cancelling gives a clean
//! shutdown.
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core;

/// It starts the job that walks the DHT until the token is cancelled.
#[must_use]
pub fn start_job(crawler: &Arc<core::Crawler>, cancellation: CancellationToken) -> JoinHandle<()> {
    let crawler = crawler.clone();

    tokio::spawn(async move {
        info!("Starting DHT crawl..");
        crawler.crawl(cancellation).await;
        info!("DHT crawl stopped");
    })
}
