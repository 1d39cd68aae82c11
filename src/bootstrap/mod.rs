//! Setup for the application.
//!
//! The [`app::setup`] function builds the application dependencies; the jobs
//! in [`jobs`] actually start the work. See
//! [`app::start`](crate::app::start).
pub mod app;
pub mod config;
pub mod jobs;
pub mod logging;
