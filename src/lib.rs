//! **Magnetite** is a `BitTorrent` DHT crawler and metadata indexer.
//!
//! It walks the Mainline DHT, samples infohashes observed in the wild
//! (BEP 51), pulls torrent metadata straight from peers over the wire
//! protocol (`ut_metadata`, BEP 9), scores the metadata into an inverted
//! index and answers full-text queries against that index.
//!
//! The crawler is deliberately impolite: it does not serve DHT queries,
//! answer pings or maintain a routing table, and it never downloads torrent
//! *data*, only info dictionaries.
//!
//! # Table of contents
//!
//! - [Components](#components)
//! - [How a torrent gets indexed](#how-a-torrent-gets-indexed)
//! - [Embedding](#embedding)
//! - [Configuration](#configuration)
//! - [Persistence](#persistence)
//!
//! # Components
//!
//! - [`core::Crawler`]: the bounded-concurrency crawl scheduler.
//! - [`core::databases`]: the persistent store (metadata + inverted index).
//! - [`core::indexer`] and [`core::services::query`]: the index writer and
//! the query evaluator.
//! - [`core::metainfo`]: extraction of names and file paths from raw info
//! dictionaries.
//! - [`shared::bit_torrent::dht`]: the one-shot KRPC client (`find_node`,
//! `get_peers`, `sample_infohashes`).
//! - [`shared::bit_torrent::peer_wire`]: the peer metadata session.
//! - [`magnetite_bencode`]: the bencode codec underneath both protocols.
//!
//! # How a torrent gets indexed
//!
//! ```text
//! bootstrap nodes ──> work queue ──> worker: find_node ──> more addresses
//!                                        │
//!                                        └─ sample_infohashes ──> unseen infohash
//!                                                                     │
//!                peers <── get_peers walk <───────────────────────────┘
//!                  │
//!                  └─ ut_metadata session ──> raw info dict ──> store ──> index
//! ```
//!
//! # Embedding
//!
//! A front-end embeds the crawler through the service layer:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use magnetite::core::services::{crawler_factory, query};
//! use magnetite_configuration::Configuration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(Configuration::default());
//!     let crawler = Arc::new(crawler_factory(&config));
//!
//!     let cancellation = CancellationToken::new();
//!     let crawl = tokio::spawn({
//!         let crawler = crawler.clone();
//!         let cancellation = cancellation.clone();
//!         async move { crawler.crawl(cancellation).await }
//!     });
//!
//!     // ... later, from a request handler:
//!     let results = query::search(&crawler, "big bang theory").await.unwrap();
//!     for hit in results {
//!         println!("{} {}", hit.info_hash, hit.name);
//!     }
//!
//!     cancellation.cancel();
//!     let _ = crawl.await;
//! }
//! ```
//!
//! Admin helpers (`exists`, `remove`, `list_info_hashes`) live in
//! [`core::services::metadata`].
//!
//! # Configuration
//!
//! All limits and timeouts come from
//! [`magnetite-configuration`](magnetite_configuration): worker pool size,
//! queue capacity, per-step timeouts, cleanup interval, bootstrap nodes and
//! the store path. Everything has a default; see that crate's documentation.
//!
//! # Persistence
//!
//! One SQLite file (default `./torrent.db`) holds two namespaces: raw
//! metadata keyed by infohash, and the inverted index keyed by
//! `(token, infohash)` with a `u32` score. See [`core::databases`].
pub mod app;
pub mod bootstrap;
pub mod core;
pub mod shared;
