//! Crawler domain services.
//!
//! There are two groups of services:
//!
//! - [Query services](crate::core::services::query): full-text search over
//! the inverted index.
//! - [Metadata services](crate::core::services::metadata): admin helpers for
//! stored torrents.
pub mod metadata;
pub mod query;

use std::sync::Arc;

use magnetite_configuration::Configuration;

use crate::core::Crawler;

/// It returns a new crawler building its dependencies.
///
/// # Panics
///
/// Will panic if the crawler cannot be instantiated, e.g. the store cannot be
/// opened.
#[must_use]
pub fn crawler_factory(config: &Arc<Configuration>) -> Crawler {
    match Crawler::new(config) {
        Ok(crawler) => crawler,
        Err(error) => {
            panic!("{error}")
        }
    }
}
