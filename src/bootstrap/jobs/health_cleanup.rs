//! Job that runs a task on intervals to clean up the node health map.
//!
//! Nodes that have not been contacted for one `cleanup_interval` carry no
//! useful signal any more; keeping them would only make the map grow with the
//! crawl. The job shares no state with the fast path beyond the map itself.
use std::sync::Arc;
use std::time::Instant;

use magnetite_configuration::Crawler as CrawlerConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core;

/// It starts a job for cleaning up the node health records in the crawler.
///
/// The cleaning task is executed every `cleanup_interval`.
#[must_use]
pub fn start_job(config: &CrawlerConfig, crawler: &Arc<core::Crawler>, cancellation: CancellationToken) -> JoinHandle<()> {
    let weak_crawler = Arc::downgrade(crawler);
    let interval = config.cleanup_interval();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.tick().await;

        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    info!("Stopping node health cleanup job..");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(crawler) = weak_crawler.upgrade() {
                        let start_time = Instant::now();
                        let evicted = crawler.evict_stale_nodes();
                        info!("Evicted {evicted} stale node(s) in: {}ms", start_time.elapsed().as_millis());
                    } else {
                        break;
                    }
                }
            }
        }
    })
}
