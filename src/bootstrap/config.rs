//! Loading of the crawler configuration.
use std::path::Path;

use magnetite_configuration::{Configuration, DEFAULT_CONFIG_PATH, ENV_VAR_CONFIG_TOML};
use tracing::info;

/// It loads the application configuration.
///
/// When neither the configuration file nor the environment override exists, a
/// configuration file with the default values is written first, so operators
/// have something to edit.
///
/// # Panics
///
/// Will panic if the configuration cannot be loaded or the default
/// configuration file cannot be written.
#[must_use]
pub fn initialize_configuration() -> Configuration {
    if std::env::var(ENV_VAR_CONFIG_TOML).is_err() && !Path::new(DEFAULT_CONFIG_PATH).exists() {
        let rendered = Configuration::default()
            .to_toml()
            .expect("default configuration should serialize");
        std::fs::write(DEFAULT_CONFIG_PATH, rendered).expect("could not write the default configuration file");
        info!("wrote a default configuration to {DEFAULT_CONFIG_PATH}");
    }

    Configuration::load(DEFAULT_CONFIG_PATH).expect("configuration could not be loaded")
}
