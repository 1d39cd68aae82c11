//! Setup for the main crawler application.
//!
//! The [`setup`] function only builds the application and its dependencies,
//! it does not start anything. Starting happens in
//! [`app::start`](crate::app::start), which launches the independent jobs.
//!
//! Setup steps:
//!
//! 1. Load the global application configuration.
//! 2. Initialize logging.
//! 3. Initialize the domain crawler (which opens the store).
use std::sync::Arc;

use magnetite_configuration::Configuration;

use super::config::initialize_configuration;
use crate::bootstrap;
use crate::core::services::crawler_factory;
use crate::core::Crawler;

/// It loads the configuration and builds the crawler with its dependencies.
///
/// # Panics
///
/// Will panic if the configuration is invalid or the store cannot be opened.
#[must_use]
pub fn setup() -> (Arc<Configuration>, Arc<Crawler>) {
    let configuration = Arc::new(initialize_configuration());

    bootstrap::logging::setup(&configuration);

    let crawler = Arc::new(crawler_factory(&configuration));

    (configuration, crawler)
}
