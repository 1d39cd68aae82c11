//! Errors for the crawl and query paths.
//!
//! Per-node and per-peer failures are a normal part of crawling the DHT, so
//! nothing here ever aborts a crawl. The scheduler's reaction to an error is
//! local: mark the node unhealthy and move on. Only opening the store can be
//! fatal, and that happens before any crawl starts.
use std::time::Duration;

use thiserror::Error;

use super::databases;

#[derive(Error, Debug)]
pub enum Error {
    /// Dial, read or write failure, including timeouts. The remote gets
    /// penalized in the health map.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// The remote answered with bytes that violate its protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer cannot exchange metadata. Common and harmless; the node is
    /// not penalized for it.
    #[error("peer does not support ut_metadata")]
    NotSupported,

    /// The persistent store failed.
    #[error("store error: {0}")]
    Store(#[from] databases::error::Error),

    /// A query contained no usable tokens.
    #[error("query contains no usable tokens")]
    EmptyQuery,

    /// Caller-supplied input was unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The crawl was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// A timeout, expressed as the `Network` failure it is.
    #[must_use]
    pub fn timed_out(operation: &str) -> Self {
        Self::Network(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("{operation} timed out"),
        ))
    }

    /// The terminal state of a metadata subtask that ran out of peers.
    #[must_use]
    pub fn no_peers() -> Self {
        Self::Network(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no reachable peer served the metadata",
        ))
    }

    /// The terminal state of a metadata subtask that overran its deadline.
    #[must_use]
    pub fn deadline_exceeded(deadline: Duration) -> Self {
        Self::Network(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("metadata subtask exceeded its {deadline:?} deadline"),
        ))
    }
}

impl From<magnetite_bencode::Error> for Error {
    fn from(err: magnetite_bencode::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
