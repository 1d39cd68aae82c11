//! The persistence module.
//!
//! Persistence is implemented with one [`Database`] trait and currently one
//! driver, [`Sqlite`](crate::core::databases::sqlite::Sqlite). The store
//! outlives any crawl: it is opened once at process start and closed at
//! shutdown. SQLite gives the concurrency contract the crawler relies on:
//! many readers, one writer, writes serialized, and crash atomicity at the
//! transaction boundary.
//!
//! The persistent objects are the two namespaces of the index:
//!
//! # Metadata
//!
//!  Field        | Sample data                                | Description
//! ---|---|---
//!  `info_hash`  | `c1277613db1d28709b034a017ab2cae4be07ae10` | `BitTorrent` infohash V1, primary key
//!  `metadata`   | raw bytes                                  | The bencoded info dictionary as pulled from a peer
//!
//! # Search
//!
//!  Field        | Sample data                                | Description
//! ---|---|---
//!  `token`      | `sheldon`                                  | A lowercase search token
//!  `info_hash`  | `c1277613db1d28709b034a017ab2cae4be07ae10` | The torrent the token occurs in
//!  `score`      | 30                                         | The token's weight for that torrent
//!
//! `(token, info_hash)` is the primary key of `search`. Every infohash in
//! `search` also exists in `metadata`: metadata is stored first and postings
//! are removed in the same transaction that removes the metadata.
pub mod driver;
pub mod error;
pub mod sqlite;

use std::marker::PhantomData;

use async_trait::async_trait;
use magnetite_primitives::info_hash::InfoHash;

use self::error::Error;

struct Builder<T>
where
    T: Database,
{
    phantom: PhantomData<T>,
}

impl<T> Builder<T>
where
    T: Database + 'static,
{
    pub(self) fn build(db_path: &str) -> Result<Box<dyn Database>, Error> {
        Ok(Box::new(T::new(db_path)?))
    }
}

/// The persistence trait. It contains all the methods to interact with the
/// database.
#[async_trait]
pub trait Database: Sync + Send {
    /// It instantiates a new database driver.
    ///
    /// # Errors
    ///
    /// Will return `r2d2::Error` if `db_path` is not able to create a database.
    fn new(db_path: &str) -> Result<Self, Error>
    where
        Self: std::marker::Sized;

    // Schema

    /// It generates the database tables. SQL queries are hardcoded in the
    /// trait implementation.
    ///
    /// # Context: Schema
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to create own tables.
    fn create_database_tables(&self) -> Result<(), Error>;

    /// It drops the database tables.
    ///
    /// # Context: Schema
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to drop tables.
    fn drop_database_tables(&self) -> Result<(), Error>;

    // Metadata

    /// It stores the raw info dictionary for a torrent. The write is one
    /// transaction: a partial blob is never visible. Storing the same
    /// infohash again replaces the previous blob.
    ///
    /// # Context: Metadata
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn persist_metadata(&self, info_hash: &InfoHash, metadata: &[u8]) -> Result<(), Error>;

    /// It loads the raw info dictionary for a torrent, if stored.
    ///
    /// # Context: Metadata
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn load_metadata(&self, info_hash: &InfoHash) -> Result<Option<Vec<u8>>, Error>;

    /// It checks whether metadata for the torrent is already stored.
    ///
    /// This is the crawler's seen-set: consulted before opening a peer
    /// session for a sampled infohash.
    ///
    /// # Context: Metadata
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn metadata_exists(&self, info_hash: &InfoHash) -> Result<bool, Error>;

    /// It lists all stored infohashes in lexicographic order.
    ///
    /// # Context: Metadata
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn list_info_hashes(&self) -> Result<Vec<InfoHash>, Error>;

    /// It removes a torrent's metadata and all its search postings in one
    /// transaction.
    ///
    /// # Context: Metadata
    ///
    /// # Errors
    ///
    /// Will return `Err` if the torrent is not stored or the delete fails.
    async fn delete_torrent(&self, info_hash: &InfoHash) -> Result<(), Error>;

    // Search

    /// It replaces a torrent's postings with the given `(token, score)` rows
    /// in one transaction. Re-indexing a torrent is therefore idempotent.
    ///
    /// # Context: Search
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to save.
    async fn upsert_scores(&self, info_hash: &InfoHash, scores: &[(String, u32)]) -> Result<(), Error>;

    /// It scans one token's postings in infohash order.
    ///
    /// # Context: Search
    ///
    /// # Errors
    ///
    /// Will return `Err` if unable to load.
    async fn search_token(&self, token: &str) -> Result<Vec<(InfoHash, u32)>, Error>;
}
