//! Crawler configuration factories for testing.
use std::env;

use magnetite_configuration::Configuration;

use crate::random;

/// This configuration is used for testing. It generates a random store path
/// so tests do not collide when they run in parallel.
///
/// > **NOTICE**: the bootstrap node list is emptied so that no test touches
/// the real DHT unless it opts in explicitly.
///
/// # Panics
///
/// Will panic if it can't convert the temp file path to string
#[must_use]
pub fn ephemeral() -> Configuration {
    let mut config = Configuration {
        log_level: Some("off".to_string()),
        ..Default::default()
    };

    // Ephemeral sqlite database
    let temp_directory = env::temp_dir();
    let random_db_id = random::string(16);
    let temp_file = temp_directory.join(format!("data_{random_db_id}.db"));
    temp_file.to_str().unwrap().clone_into(&mut config.database.path);

    // No real-world network traffic from tests
    config.crawler.bootstrap_nodes = vec![];

    config
}
