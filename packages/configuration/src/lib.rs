//! Configuration data structures for the magnetite crawler.
//!
//! Configuration is loaded from a [TOML](https://toml.io/en/) file
//! (`magnetite.toml` in the working directory by default) or from the
//! environment variable `MAGNETITE_CONFIG_TOML` with the same content as the
//! file. Every option has a default, so an empty (or absent) file yields a
//! working crawler.
//!
//! # Sections
//!
//! - [`Crawler`]: concurrency limits, timeouts and bootstrap nodes.
//! - [`Database`]: where the metadata store lives.
//!
//! # Default configuration
//!
//! ```toml
//! log_level = "info"
//!
//! [crawler]
//! max_concurrent_nodes = 100
//! max_queue_size = 10000
//! metadata_subpool_size = 20
//! connect_timeout_secs = 5
//! request_timeout_secs = 10
//! cleanup_interval_secs = 300
//! strict_metadata_validation = true
//! bootstrap_nodes = [
//!     "router.bittorrent.com:6881",
//!     "router.utorrent.com:6881",
//!     "dht.transmissionbt.com:6881",
//! ]
//!
//! [database]
//! path = "./torrent.db"
//! ```
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding a whole configuration file as inline TOML.
pub const ENV_VAR_CONFIG_TOML: &str = "MAGNETITE_CONFIG_TOML";

/// Prefix for environment variables overriding single options.
pub const ENV_VAR_PREFIX: &str = "MAGNETITE_";

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "magnetite.toml";

/// Errors raised while loading the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to load the configuration from the configuration source: {source}")]
    UnableToLoadFromSource {
        #[from]
        source: figment::Error,
    },

    #[error("Unable to serialize the configuration to TOML: {source}")]
    UnableToSerialize {
        #[from]
        source: toml::ser::Error,
    },
}

/// The whole crawler configuration.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Configuration {
    /// Logging level. Possible values (case insensitive): `off`, `error`,
    /// `warn`, `info`, `debug`, `trace`.
    #[serde(default = "Configuration::default_log_level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Crawl scheduling and protocol options.
    #[serde(default)]
    pub crawler: Crawler,

    /// Persistent store options.
    #[serde(default)]
    pub database: Database,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            crawler: Crawler::default(),
            database: Database::default(),
        }
    }
}

impl Configuration {
    fn default_log_level() -> Option<String> {
        Some("info".to_string())
    }

    /// Loads the configuration.
    ///
    /// Sources are merged over the defaults, later ones win:
    ///
    /// 1. The TOML file at `path` (ignored when the file does not exist).
    /// 2. The inline TOML in `MAGNETITE_CONFIG_TOML`, if set.
    /// 3. Individual `MAGNETITE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Will return an error if any source fails to parse or a value has the
    /// wrong type.
    pub fn load(path: &str) -> Result<Configuration, Error> {
        let mut figment = Figment::from(Serialized::defaults(Configuration::default())).merge(Toml::file(path));

        if let Ok(config_toml) = std::env::var(ENV_VAR_CONFIG_TOML) {
            figment = figment.merge(Toml::string(&config_toml));
        }

        let config = figment.merge(Env::prefixed(ENV_VAR_PREFIX).split("__")).extract()?;

        Ok(config)
    }

    /// Renders the configuration as a TOML document.
    ///
    /// # Errors
    ///
    /// Will return an error if the configuration cannot be serialized.
    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Crawl scheduling and protocol options.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Crawler {
    /// Upper bound on concurrently contacted DHT nodes.
    #[serde(default = "Crawler::default_max_concurrent_nodes")]
    pub max_concurrent_nodes: usize,

    /// Capacity of the node work queue. Discovered addresses beyond this are
    /// dropped; the DHT replenishes itself.
    #[serde(default = "Crawler::default_max_queue_size")]
    pub max_queue_size: usize,

    /// Upper bound on concurrent metadata sessions spawned by one node visit.
    #[serde(default = "Crawler::default_metadata_subpool_size")]
    pub metadata_subpool_size: usize,

    /// Timeout in seconds for dialing a UDP node.
    #[serde(default = "Crawler::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout in seconds for a single protocol step (UDP read, TCP connect,
    /// TCP read).
    #[serde(default = "Crawler::default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval in seconds between node-health eviction passes. Entries not
    /// touched for one interval are evicted.
    #[serde(default = "Crawler::default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// When `true`, a fetched info dictionary is discarded unless its SHA-1
    /// equals the infohash it was requested for.
    #[serde(default = "Crawler::default_strict_metadata_validation")]
    pub strict_metadata_validation: bool,

    /// The crawler's own DHT node id as 40 hex characters. A random id is
    /// generated at startup when unset.
    #[serde(default = "Crawler::default_node_id", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    /// DHT nodes seeding the crawl.
    #[serde(default = "Crawler::default_bootstrap_nodes")]
    pub bootstrap_nodes: Vec<String>,
}

impl Default for Crawler {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: Self::default_max_concurrent_nodes(),
            max_queue_size: Self::default_max_queue_size(),
            metadata_subpool_size: Self::default_metadata_subpool_size(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            cleanup_interval_secs: Self::default_cleanup_interval_secs(),
            strict_metadata_validation: Self::default_strict_metadata_validation(),
            node_id: Self::default_node_id(),
            bootstrap_nodes: Self::default_bootstrap_nodes(),
        }
    }
}

impl Crawler {
    fn default_max_concurrent_nodes() -> usize {
        100
    }

    fn default_max_queue_size() -> usize {
        10_000
    }

    fn default_metadata_subpool_size() -> usize {
        20
    }

    fn default_connect_timeout_secs() -> u64 {
        5
    }

    fn default_request_timeout_secs() -> u64 {
        10
    }

    fn default_cleanup_interval_secs() -> u64 {
        300
    }

    fn default_strict_metadata_validation() -> bool {
        true
    }

    fn default_node_id() -> Option<String> {
        None
    }

    fn default_bootstrap_nodes() -> Vec<String> {
        vec![
            "router.bittorrent.com:6881".to_string(),
            "router.utorrent.com:6881".to_string(),
            "dht.transmissionbt.com:6881".to_string(),
        ]
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Persistent store options.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Database {
    /// Filesystem path of the store file.
    #[serde(default = "Database::default_path")]
    pub path: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

impl Database {
    fn default_path() -> String {
        "./torrent.db".to_string()
    }
}

#[cfg(test)]
mod tests {

    mod the_configuration {
        use crate::Configuration;

        #[test]
        fn it_should_have_the_documented_defaults() {
            let configuration = Configuration::default();

            assert_eq!(configuration.crawler.max_concurrent_nodes, 100);
            assert_eq!(configuration.crawler.max_queue_size, 10_000);
            assert_eq!(configuration.crawler.metadata_subpool_size, 20);
            assert_eq!(configuration.crawler.connect_timeout_secs, 5);
            assert_eq!(configuration.crawler.request_timeout_secs, 10);
            assert_eq!(configuration.crawler.cleanup_interval_secs, 300);
            assert!(configuration.crawler.strict_metadata_validation);
            assert_eq!(configuration.crawler.bootstrap_nodes.len(), 3);
            assert_eq!(configuration.database.path, "./torrent.db");
        }

        #[test]
        fn it_should_round_trip_through_toml() {
            let configuration = Configuration::default();

            let rendered = configuration.to_toml().unwrap();
            let parsed: Configuration = toml::from_str(&rendered).unwrap();

            assert_eq!(parsed, configuration);
        }

        #[test]
        fn it_should_load_overrides_from_an_inline_toml_env_var() {
            figment::Jail::expect_with(|jail| {
                jail.set_env(crate::ENV_VAR_CONFIG_TOML, "[crawler]\nmax_concurrent_nodes = 7\n");

                let configuration = Configuration::load("missing.toml").expect("valid configuration");

                assert_eq!(configuration.crawler.max_concurrent_nodes, 7);
                assert_eq!(configuration.crawler.max_queue_size, 10_000);
                Ok(())
            });
        }

        #[test]
        fn it_should_fall_back_to_defaults_when_no_source_exists() {
            figment::Jail::expect_with(|jail| {
                let _ = jail;

                let configuration = Configuration::load("missing.toml").expect("valid configuration");

                assert_eq!(configuration, Configuration::default());
                Ok(())
            });
        }
    }
}
