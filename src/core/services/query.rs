//! The query evaluator.
//!
//! A free-text query is tokenized with the indexer's rules, each token's
//! postings are aggregated, and the matching torrents come back ranked by
//! their summed score. Ties are broken by ascending infohash so results are
//! reproducible.
use std::collections::HashMap;

use magnetite_primitives::info_hash::InfoHash;
use serde::Serialize;
use tracing::debug;

use crate::core::error::Error;
use crate::core::{indexer, metainfo, Crawler};

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// The torrent the query matched.
    pub info_hash: InfoHash,
    /// The torrent name.
    pub name: String,
    /// Path components of all files in the torrent.
    pub files: Vec<String>,
}

/// It evaluates a free-text query against the inverted index.
///
/// Tokens the index has never seen contribute nothing; a query where every
/// token misses returns an empty list.
///
/// # Errors
///
/// Will return an `EmptyQuery` error when the query yields no usable tokens
/// and a `Store` error when the index cannot be read.
pub async fn search(crawler: &Crawler, query: &str) -> Result<Vec<SearchResult>, Error> {
    let tokens = indexer::tokenize(query);
    if tokens.is_empty() {
        return Err(Error::EmptyQuery);
    }

    let mut totals: HashMap<InfoHash, u64> = HashMap::new();

    for token in &tokens {
        for (info_hash, score) in crawler.database.search_token(token).await? {
            *totals.entry(info_hash).or_insert(0) += u64::from(score);
        }
    }

    let mut ranked: Vec<(InfoHash, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut results = Vec::with_capacity(ranked.len());

    for (info_hash, _total) in ranked {
        let Some(metadata) = crawler.database.load_metadata(&info_hash).await? else {
            // The pair of writes is only guaranteed at crawl completion;
            // mid-crawl a posting may momentarily precede its metadata.
            debug!("search hit {info_hash} has no stored metadata yet; skipping");
            continue;
        };

        match metainfo::parse(&metadata) {
            Ok(metainfo) => results.push(SearchResult {
                info_hash,
                name: metainfo.name,
                files: metainfo.files,
            }),
            Err(err) => {
                debug!("stored metadata for {info_hash} failed to parse: {err}");
            }
        }
    }

    Ok(results)
}
