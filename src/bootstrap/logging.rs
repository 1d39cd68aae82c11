//! Setup for the application logging.
//!
//! It redirects the tracing events to the standard output with the level
//! defined in the configuration.
//!
//! - `Off`
//! - `Error`
//! - `Warn`
//! - `Info`
//! - `Debug`
//! - `Trace`
use std::str::FromStr;
use std::sync::Once;

use magnetite_configuration::Configuration;
use tracing::info;
use tracing::level_filters::LevelFilter;

static INIT: Once = Once::new();

/// It redirects tracing events to the standard output with the level defined
/// in the configuration.
///
/// # Panics
///
/// Will panic if the level in the configuration is malformed.
pub fn setup(cfg: &Configuration) {
    let level = config_level_or_default(&cfg.log_level);

    if level == LevelFilter::OFF {
        return;
    }

    INIT.call_once(|| {
        stdout_config(level);
    });
}

fn config_level_or_default(log_level: &Option<String>) -> LevelFilter {
    match log_level {
        None => LevelFilter::INFO,
        Some(level) => LevelFilter::from_str(level).expect("configured log level should be a valid level name"),
    }
}

fn stdout_config(filter: LevelFilter) {
    tracing_subscriber::fmt().with_max_level(filter).init();

    info!("logging initialized.");
}
