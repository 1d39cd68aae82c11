//! Application jobs launchers.
//!
//! The main application setup has only two main stages:
//!
//! 1. Setup the domain layer: the core crawler.
//! 2. Launch the application services as concurrent jobs.
//!
//! This module contains the functions needed to start those jobs:
//!
//! - [`crawler`]: the DHT crawl itself.
//! - [`health_cleanup`]: periodic eviction of stale node health records.
pub mod crawler;
pub mod health_cleanup;
