//! The core `crawler` module contains the crawl and index logic which is
//! independent of any delivery layer.
//!
//! ```text
//! Delivery layer      Domain layer
//!
//! Search front-end |
//!     Console bin  |> Core crawler
//!   Embedding API  |
//! ```
//!
//! # Crawler
//!
//! The [`Crawler`] is the main struct in this module. It owns everything one
//! crawl needs:
//!
//! - **Scheduling**: a bounded work queue of node addresses and a worker pool
//! capped by a counting semaphore.
//! - **Node health**: per-address failure counts and backoff, so broken nodes
//! are skipped instead of hammered.
//! - **Persistence**: the metadata store and inverted index behind the
//! [`Database`] trait.
//!
//! One crawl invocation walks the DHT: each visited node is asked for more
//! nodes (`find_node`, fed back into the queue) and for a sample of the
//! infohashes it has seen (`sample_infohashes`, BEP 51). Every sampled
//! infohash that is not yet stored triggers a metadata subtask, which
//! resolves peers via `get_peers` and pulls the info dictionary over the peer
//! wire protocol. Successful pulls are stored and indexed synchronously, so
//! at the end of a crawl every posting has its metadata.
//!
//! The in-memory structures (queue, health map) belong to one crawl and are
//! discarded with it; the store outlives crawls and is shared with the query
//! side.
//!
//! # Cancellation
//!
//! A single [`CancellationToken`] scopes a whole crawl. Workers observe it
//! between protocol steps and in-flight socket operations are dropped at the
//! next suspension point; [`Crawler::crawl`] drains its workers before
//! returning, so no task outlives the call.
pub mod databases;
pub mod error;
pub mod health;
pub mod indexer;
pub mod metainfo;
pub mod services;

use std::collections::{HashSet, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use magnetite_configuration::Configuration;
use magnetite_primitives::info_hash::InfoHash;
use magnetite_primitives::NodeId;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::databases::driver::Driver;
use self::databases::Database;
use self::error::Error;
use self::health::NodeHealth;
use crate::shared::bit_torrent::dht::client::KrpcClient;
use crate::shared::bit_torrent::dht::messages::GetPeersResponse;
use crate::shared::bit_torrent::peer_wire::client::MetadataClient;

/// How many `get_peers` lookups one metadata subtask may spend walking
/// toward peers before giving up.
const MAX_PEER_LOOKUPS: usize = 16;

/// Slack on top of the peer-session timeouts for one metadata subtask.
const SUBTASK_DEADLINE_SLACK: Duration = Duration::from_secs(10);

/// The domain layer crawler service.
///
/// It is a container for the crawl configuration, persistence and the
/// protocol clients. The query and admin services in
/// [`services`](crate::core::services) read through it as well.
pub struct Crawler {
    /// The store driver: [`Sqlite3`](crate::core::databases::sqlite)
    pub database: Arc<Box<dyn Database>>,
    config: Arc<Configuration>,
    health: NodeHealth,
    krpc: KrpcClient,
    metadata_client: MetadataClient,
}

impl Crawler {
    /// `Crawler` constructor.
    ///
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if unable to open the store.
    /// The `Crawler` is responsible for the persistence.
    pub fn new(config: &Arc<Configuration>) -> Result<Crawler, databases::error::Error> {
        let database = Arc::new(databases::driver::build(&Driver::Sqlite3, &config.database.path)?);

        let node_id = resolve_node_id(config.crawler.node_id.as_deref());

        let krpc = KrpcClient::new(node_id, config.crawler.connect_timeout(), config.crawler.request_timeout());

        // The original peer protocol allows a slower dial than UDP does, so
        // the TCP connect deadline follows the request timeout.
        let metadata_client = MetadataClient::new(
            config.crawler.request_timeout(),
            config.crawler.request_timeout(),
            config.crawler.strict_metadata_validation,
        );

        Ok(Crawler {
            database,
            config: config.clone(),
            health: NodeHealth::new(),
            krpc,
            metadata_client,
        })
    }

    /// Runs one crawl until the token is cancelled.
    ///
    /// The work queue is seeded with the configured bootstrap nodes and
    /// refilled by the workers themselves; enqueueing never blocks, overflow
    /// drops the address. Up to `max_concurrent_nodes` node sessions run at
    /// once. After cancellation the in-flight workers are drained before the
    /// call returns.
    pub async fn crawl(self: Arc<Self>, cancellation: CancellationToken) {
        let (queue_tx, mut queue_rx) = mpsc::channel::<String>(self.config.crawler.max_queue_size);

        for address in &self.config.crawler.bootstrap_nodes {
            if queue_tx.try_send(address.clone()).is_err() {
                warn!("work queue overflowed while seeding bootstrap nodes");
            }
        }

        info!("crawl started with {} bootstrap node(s)", self.config.crawler.bootstrap_nodes.len());

        let gate = Arc::new(Semaphore::new(self.config.crawler.max_concurrent_nodes));
        let mut workers: JoinSet<()> = JoinSet::new();

        loop {
            // Reap finished workers so the set does not grow with the crawl.
            while workers.try_join_next().is_some() {}

            let address = tokio::select! {
                () = cancellation.cancelled() => break,
                address = queue_rx.recv() => match address {
                    Some(address) => address,
                    None => break,
                },
            };

            let permit = tokio::select! {
                () = cancellation.cancelled() => break,
                permit = gate.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let crawler = self.clone();
            let queue = queue_tx.clone();
            let token = cancellation.clone();

            workers.spawn(async move {
                let _permit = permit;
                crawler.process_node(address, &queue, &token).await;
            });
        }

        while workers.join_next().await.is_some() {}

        info!("crawl drained; {} node(s) in the health map", self.health.len());
    }

    /// One node visit: discover more nodes, sample infohashes, and spawn a
    /// bounded batch of metadata subtasks for the unseen ones.
    async fn process_node(self: Arc<Self>, address: String, queue: &mpsc::Sender<String>, cancellation: &CancellationToken) {
        let address = address.as_str();

        if !self.health.is_eligible(address) {
            debug!("skipping {address}: failed too often or contacted too recently");
            return;
        }

        let find_node_target = rand::random();
        let nodes = tokio::select! {
            () = cancellation.cancelled() => return,
            result = self.krpc.find_node(address, &find_node_target) => result,
        };

        let nodes = match nodes {
            Ok(nodes) => {
                self.health.record_success(address);
                nodes
            }
            Err(err) => {
                self.health.record_failure(address);
                debug!("find_node to {address} failed: {err}");
                return;
            }
        };

        for node in nodes {
            // Overflow drops are by design; the DHT replenishes itself.
            let _ = queue.try_send(node);
        }

        let sample_target = rand::random();
        let response = tokio::select! {
            () = cancellation.cancelled() => return,
            result = self.krpc.sample_infohashes(address, &sample_target) => result,
        };

        let response = match response {
            Ok(response) => {
                self.health.record_success(address);
                response
            }
            Err(err) => {
                self.health.record_failure(address);
                debug!("sample_infohashes to {address} failed: {err}");
                return;
            }
        };

        for node in response.nodes {
            let _ = queue.try_send(node);
        }

        if response.samples.is_empty() {
            return;
        }

        debug!("{address} sampled {} infohash(es)", response.samples.len());

        let subpool = Arc::new(Semaphore::new(self.config.crawler.metadata_subpool_size));
        let deadline = self.config.crawler.request_timeout() * 2 + SUBTASK_DEADLINE_SLACK;
        let mut subtasks: JoinSet<()> = JoinSet::new();

        for info_hash in response.samples {
            if cancellation.is_cancelled() {
                break;
            }

            match self.database.metadata_exists(&info_hash).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    warn!("seen-set lookup for {info_hash} failed: {err}");
                    continue;
                }
            }

            let crawler = self.clone();
            let origin = address.to_string();
            let token = cancellation.clone();
            let permits = subpool.clone();

            subtasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };

                tokio::select! {
                    () = token.cancelled() => {}
                    result = time::timeout(deadline, crawler.fetch_and_index(&origin, info_hash)) => {
                        match result {
                            Ok(Ok(())) => info!("stored metadata for {info_hash}"),
                            Ok(Err(err)) => debug!("metadata for {info_hash} unavailable: {err}"),
                            Err(_) => debug!("{}", Error::deadline_exceeded(deadline)),
                        }
                    }
                }
            });
        }

        while subtasks.join_next().await.is_some() {}
    }

    /// Resolves peers for an infohash and pulls its metadata from the first
    /// peer that serves it.
    ///
    /// The walk starts at the node that sampled the infohash and follows
    /// `get_peers` referrals toward nodes closer to it, bounded by
    /// [`MAX_PEER_LOOKUPS`] and the caller's deadline.
    async fn fetch_and_index(&self, origin: &str, info_hash: InfoHash) -> Result<(), Error> {
        let mut pending: VecDeque<String> = VecDeque::from([origin.to_string()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut lookups = 0;

        while let Some(node) = pending.pop_front() {
            if lookups >= MAX_PEER_LOOKUPS {
                break;
            }
            if !visited.insert(node.clone()) {
                continue;
            }
            lookups += 1;

            match self.krpc.get_peers(&node, &info_hash).await {
                Ok(GetPeersResponse::Peers(peers)) => {
                    for peer in peers {
                        match self.metadata_client.fetch_metadata(&peer, &info_hash).await {
                            Ok(metadata) => {
                                self.store_and_index(&info_hash, &metadata).await?;
                                return Ok(());
                            }
                            Err(err) => debug!("peer {peer} did not serve {info_hash}: {err}"),
                        }
                    }
                }
                Ok(GetPeersResponse::Nodes(nodes)) => pending.extend(nodes),
                Err(err) => debug!("get_peers to {node} for {info_hash} failed: {err}"),
            }
        }

        Err(Error::no_peers())
    }

    /// Stores the raw blob, then indexes it. The two writes are separate
    /// transactions, in this order, so a posting never outlives its
    /// metadata.
    async fn store_and_index(&self, info_hash: &InfoHash, metadata: &[u8]) -> Result<(), Error> {
        self.database.persist_metadata(info_hash, metadata).await?;

        indexer::index_metadata(self.database.as_ref().as_ref(), info_hash, metadata).await?;

        Ok(())
    }

    /// Evicts health records that have gone quiet for one cleanup interval.
    /// Returns how many were dropped.
    pub fn evict_stale_nodes(&self) -> usize {
        self.health.evict_stale(self.config.crawler.cleanup_interval())
    }
}

fn resolve_node_id(configured: Option<&str>) -> NodeId {
    match configured {
        Some(hex) => match InfoHash::from_str(hex) {
            Ok(id) => id.bytes(),
            Err(_) => {
                warn!("configured node_id is not 40 hex characters; generating a random id");
                rand::random()
            }
        },
        None => rand::random(),
    }
}

#[cfg(test)]
mod tests {

    mod the_crawler {
        use std::sync::Arc;

        use magnetite_test_helpers::configuration;

        use crate::core::services::{crawler_factory, metadata, query};
        use crate::core::Crawler;

        fn ephemeral_crawler() -> Arc<Crawler> {
            let config = Arc::new(configuration::ephemeral());
            Arc::new(crawler_factory(&config))
        }

        /// The multi-file info dictionary from the metainfo tests.
        fn sample_metadata() -> &'static [u8] {
            b"d5:filesld6:lengthi1e4:pathl1:a5:b.txteed6:lengthi2e4:pathl5:c.mkveee4:name6:bundle12:piece lengthi16384e6:pieces0:e"
        }

        #[tokio::test]
        async fn it_should_make_stored_metadata_immediately_searchable() {
            let crawler = ephemeral_crawler();
            let info_hash = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap();

            crawler.store_and_index(&info_hash, sample_metadata()).await.unwrap();

            assert!(metadata::exists(&crawler, &info_hash).await.unwrap());

            let results = query::search(&crawler, "bundle").await.unwrap();

            assert_eq!(results.len(), 1);
            assert_eq!(results[0].info_hash, info_hash);
            assert_eq!(results[0].name, "bundle");
            assert_eq!(results[0].files, vec!["a", "b.txt", "c.mkv"]);
        }

        #[tokio::test]
        async fn it_should_treat_the_seen_set_as_authoritative_only_for_stored_torrents() {
            let crawler = ephemeral_crawler();
            let stored = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap();
            let unseen = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".parse().unwrap();

            crawler.store_and_index(&stored, sample_metadata()).await.unwrap();

            assert!(metadata::exists(&crawler, &stored).await.unwrap());
            assert!(!metadata::exists(&crawler, &unseen).await.unwrap());
        }

        #[tokio::test]
        async fn it_should_forget_a_deleted_torrent_in_metadata_and_search_alike() {
            let crawler = ephemeral_crawler();
            let info_hash = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap();

            crawler.store_and_index(&info_hash, sample_metadata()).await.unwrap();
            metadata::remove(&crawler, &info_hash).await.unwrap();

            assert!(!metadata::exists(&crawler, &info_hash).await.unwrap());
            assert!(query::search(&crawler, "bundle").await.unwrap().is_empty());
        }
    }
}
