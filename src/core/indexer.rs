//! Tokenization, the weight model and the index upsert.
//!
//! Names and file paths are split into lowercase tokens on every codepoint
//! that is not a Unicode letter or number. Tokens of one or two characters
//! are noise and get dropped, both here and on the query side. A token found
//! in the torrent name weighs more than one found in a file path, and
//! repeated occurrences add up.
use std::collections::BTreeMap;

use magnetite_primitives::info_hash::InfoHash;
use tracing::debug;

use super::databases::Database;
use super::error::Error;
use super::metainfo::{self, TorrentMetainfo};

/// Weight of a token occurrence in the torrent name.
pub const NAME_TOKEN_WEIGHT: u32 = 20;

/// Weight of a token occurrence in a file path component.
pub const FILE_TOKEN_WEIGHT: u32 = 10;

/// Tokens this short are dropped.
const MIN_TOKEN_CHARS: usize = 3;

/// Splits text into lowercase tokens of letters and digits, dropping tokens
/// shorter than three characters.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(ToOwned::to_owned)
        .collect()
}

/// Applies the weight model to parsed metadata.
#[must_use]
pub fn score_metadata(metainfo: &TorrentMetainfo) -> BTreeMap<String, u32> {
    let mut scores = BTreeMap::new();

    for token in tokenize(&metainfo.name) {
        *scores.entry(token).or_insert(0) += NAME_TOKEN_WEIGHT;
    }

    for file in &metainfo.files {
        for token in tokenize(file) {
            *scores.entry(token).or_insert(0) += FILE_TOKEN_WEIGHT;
        }
    }

    scores
}

/// Indexes one torrent: parses the blob, scores its tokens and replaces the
/// torrent's postings in one transaction. Indexing the same blob twice leaves
/// the store unchanged.
///
/// # Errors
///
/// Will return a `Protocol` error when the blob cannot be parsed and a
/// `Store` error when the transaction fails.
pub async fn index_metadata(database: &dyn Database, info_hash: &InfoHash, metadata: &[u8]) -> Result<(), Error> {
    let metainfo = metainfo::parse(metadata)?;

    let scores = score_metadata(&metainfo);
    if scores.is_empty() {
        debug!("no indexable tokens in metadata for {info_hash}; skipping");
        return Ok(());
    }

    let postings: Vec<(String, u32)> = scores.into_iter().collect();
    database.upsert_scores(info_hash, &postings).await?;

    Ok(())
}
