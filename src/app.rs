//! Magnetite crawler application.
//!
//! The application is a container for a handful of independent jobs sharing
//! one configuration and one crawler instance:
//!
//! - The DHT crawl itself.
//! - The node health cleanup timer.
//!
//! [`start`] launches the jobs and returns their handles; it does not wait
//! for anything. Shutdown is driven from the outside by cancelling the token
//! passed in and then awaiting the handles, which is what the binary does on
//! ctrl-c.
use std::sync::Arc;

use magnetite_configuration::Configuration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::jobs::{crawler, health_cleanup};
use crate::core;

/// It launches the application jobs: the crawl and the health cleanup timer.
pub async fn start(config: &Configuration, crawler_instance: Arc<core::Crawler>, cancellation: CancellationToken) -> Vec<JoinHandle<()>> {
    let mut jobs: Vec<JoinHandle<()>> = Vec::new();

    // Start the DHT crawl
    jobs.push(crawler::start_job(&crawler_instance, cancellation.clone()));

    // Start the periodic node health cleanup
    jobs.push(health_cleanup::start_job(&config.crawler, &crawler_instance, cancellation.clone()));

    jobs
}
