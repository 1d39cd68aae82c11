//! Database driver factory.
//!
//! See [`databases::driver::build`](crate::core::databases::driver::build)
//! function for more information.
use serde::{Deserialize, Serialize};

use super::error::Error;
use super::sqlite::Sqlite;
use super::{Builder, Database};

/// The database management system backing the store.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, derive_more::Display, Clone)]
pub enum Driver {
    /// The Sqlite3 database driver.
    Sqlite3,
}

/// It builds a new database driver.
///
/// ```rust,no_run
/// use magnetite::core::databases;
/// use magnetite::core::databases::driver::Driver;
///
/// let db_driver = Driver::Sqlite3;
/// let db_path = "./torrent.db".to_string();
/// let database = databases::driver::build(&db_driver, &db_path);
/// ```
///
/// > **WARNING**: The driver instantiation runs database migrations.
///
/// # Errors
///
/// This function will return an error if unable to connect to the database.
///
/// # Panics
///
/// This function will panic if unable to create database tables.
pub fn build(driver: &Driver, db_path: &str) -> Result<Box<dyn Database>, Error> {
    let database = match driver {
        Driver::Sqlite3 => Builder::<Sqlite>::build(db_path),
    }?;

    database.create_database_tables().expect("Could not create database tables.");

    Ok(database)
}
