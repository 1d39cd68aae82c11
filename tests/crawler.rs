//! Shutdown behavior of the crawl scheduler.
use std::sync::Arc;
use std::time::{Duration, Instant};

use magnetite::core::services::crawler_factory;
use magnetite_test_helpers::configuration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn it_should_return_promptly_when_cancelled_with_unresponsive_seeds() {
    let mut config = configuration::ephemeral();
    // TEST-NET-1 addresses swallow datagrams; these nodes never answer.
    config.crawler.bootstrap_nodes = vec!["192.0.2.1:6881".to_string(), "192.0.2.2:6881".to_string()];

    let crawler = Arc::new(crawler_factory(&Arc::new(config)));

    let cancellation = CancellationToken::new();
    let crawl = tokio::spawn({
        let crawler = crawler.clone();
        let cancellation = cancellation.clone();
        async move { crawler.crawl(cancellation).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let cancelled_at = Instant::now();
    cancellation.cancel();
    crawl.await.unwrap();

    // In-flight node sessions observe the token at their next suspension
    // point, so the drain must not wait out the network timeouts.
    assert!(cancelled_at.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn it_should_return_promptly_when_cancelled_before_any_seed_exists() {
    let config = configuration::ephemeral();

    let crawler = Arc::new(crawler_factory(&Arc::new(config)));

    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let started_at = Instant::now();
    crawler.crawl(cancellation).await;

    assert!(started_at.elapsed() < Duration::from_secs(1));
}
