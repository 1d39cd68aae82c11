//! Admin helpers over stored torrents.
//!
//! These back the embedding API: checking for a torrent, removing one, and
//! listing everything the crawler has collected.
use std::str::FromStr;

use magnetite_primitives::info_hash::InfoHash;

use crate::core::error::Error;
use crate::core::Crawler;

/// Parses a caller-supplied infohash in hex form.
///
/// # Errors
///
/// Will return an `InvalidInput` error when the input is not 40 hex
/// characters.
pub fn parse_info_hash(hex: &str) -> Result<InfoHash, Error> {
    InfoHash::from_str(hex).map_err(|_| Error::InvalidInput(format!("not a 40 character hex infohash: {hex}")))
}

/// It checks whether metadata for the torrent is stored.
///
/// # Errors
///
/// Will return a `Store` error when the store cannot be read.
pub async fn exists(crawler: &Crawler, info_hash: &InfoHash) -> Result<bool, Error> {
    Ok(crawler.database.metadata_exists(info_hash).await?)
}

/// It removes a torrent's metadata and postings.
///
/// # Errors
///
/// Will return a `Store` error when the torrent is not stored or the delete
/// fails.
pub async fn remove(crawler: &Crawler, info_hash: &InfoHash) -> Result<(), Error> {
    Ok(crawler.database.delete_torrent(info_hash).await?)
}

/// It lists all stored infohashes in lexicographic order.
///
/// # Errors
///
/// Will return a `Store` error when the store cannot be read.
pub async fn list_info_hashes(crawler: &Crawler) -> Result<Vec<InfoHash>, Error> {
    Ok(crawler.database.list_info_hashes().await?)
}
