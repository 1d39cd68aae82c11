//! Per-node health bookkeeping.
//!
//! The crawler keeps one [`NodeInfo`] record per contacted address for the
//! lifetime of a crawl. A node is *eligible* for contact when it has not
//! failed too often and has not been contacted too recently; everything else
//! is skipped, which is what keeps the crawler from hammering broken or slow
//! nodes. A periodic cleanup job evicts records that have gone quiet.
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A node stops being eligible after this many consecutive failures.
const MAX_FAILURES: u32 = 3;

/// Minimum pause between two contacts to the same node.
const CONTACT_BACKOFF: Duration = Duration::from_secs(60);

/// What the crawler remembers about one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo {
    pub last_accessed: Instant,
    pub failures: u32,
}

/// The health map: address to [`NodeInfo`], sharded for concurrent
/// read-modify-write from all workers.
#[derive(Debug, Default)]
pub struct NodeHealth {
    nodes: DashMap<String, NodeInfo>,
}

impl NodeHealth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the node may be contacted now. Unknown nodes are eligible.
    #[must_use]
    pub fn is_eligible(&self, address: &str) -> bool {
        self.nodes
            .get(address)
            .map_or(true, |info| is_eligible_at(&info, Instant::now()))
    }

    /// Records a failed contact: bumps the failure count and refreshes the
    /// access time.
    pub fn record_failure(&self, address: &str) {
        self.nodes
            .entry(address.to_string())
            .and_modify(|info| {
                info.failures += 1;
                info.last_accessed = Instant::now();
            })
            .or_insert_with(|| NodeInfo {
                last_accessed: Instant::now(),
                failures: 1,
            });
    }

    /// Records a successful contact: refreshes the access time and forgives
    /// earlier failures.
    pub fn record_success(&self, address: &str) {
        self.nodes
            .entry(address.to_string())
            .and_modify(|info| {
                info.failures = 0;
                info.last_accessed = Instant::now();
            })
            .or_insert_with(|| NodeInfo {
                last_accessed: Instant::now(),
                failures: 0,
            });
    }

    /// Drops records whose last access is older than `max_age`. Returns how
    /// many were evicted.
    pub fn evict_stale(&self, max_age: Duration) -> usize {
        let before = self.nodes.len();
        let now = Instant::now();

        self.nodes
            .retain(|_, info| now.duration_since(info.last_accessed) < max_age);

        before.saturating_sub(self.nodes.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn is_eligible_at(info: &NodeInfo, now: Instant) -> bool {
    info.failures <= MAX_FAILURES && now.duration_since(info.last_accessed) >= CONTACT_BACKOFF
}
