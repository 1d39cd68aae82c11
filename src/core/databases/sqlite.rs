//! The `SQLite3` database driver.
use std::panic::Location;
use std::str::FromStr;

use async_trait::async_trait;
use magnetite_primitives::info_hash::InfoHash;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;

use super::driver::Driver;
use super::{Database, Error};

const DRIVER: Driver = Driver::Sqlite3;

pub struct Sqlite {
    pool: Pool<SqliteConnectionManager>,
}

#[async_trait]
impl Database for Sqlite {
    /// It instantiates a new `SQLite3` database driver.
    ///
    /// Refer to [`databases::Database::new`](crate::core::databases::Database::new).
    ///
    /// # Errors
    ///
    /// Will return `r2d2::Error` if `db_path` is not able to create `SqLite` database.
    fn new(db_path: &str) -> Result<Sqlite, Error> {
        let cm = SqliteConnectionManager::file(db_path);
        Pool::new(cm).map_or_else(|err| Err((err, DRIVER).into()), |pool| Ok(Sqlite { pool }))
    }

    /// Refer to [`databases::Database::create_database_tables`](crate::core::databases::Database::create_database_tables).
    fn create_database_tables(&self) -> Result<(), Error> {
        let create_metadata_table = "
        CREATE TABLE IF NOT EXISTS metadata (
            info_hash TEXT PRIMARY KEY,
            metadata BLOB NOT NULL
        );"
        .to_string();

        let create_search_table = "
        CREATE TABLE IF NOT EXISTS search (
            token TEXT NOT NULL,
            info_hash TEXT NOT NULL,
            score INTEGER NOT NULL,
            PRIMARY KEY (token, info_hash)
        );"
        .to_string();

        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(&create_metadata_table, [])?;
        conn.execute(&create_search_table, [])?;

        Ok(())
    }

    /// Refer to [`databases::Database::drop_database_tables`](crate::core::databases::Database::drop_database_tables).
    fn drop_database_tables(&self) -> Result<(), Error> {
        let drop_metadata_table = "
        DROP TABLE metadata;"
            .to_string();

        let drop_search_table = "
        DROP TABLE search;"
            .to_string();

        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(&drop_metadata_table, [])
            .and_then(|_| conn.execute(&drop_search_table, []))?;

        Ok(())
    }

    /// Refer to [`databases::Database::persist_metadata`](crate::core::databases::Database::persist_metadata).
    async fn persist_metadata(&self, info_hash: &InfoHash, metadata: &[u8]) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let insert = conn.execute(
            "INSERT INTO metadata (info_hash, metadata) VALUES (?1, ?2) ON CONFLICT(info_hash) DO UPDATE SET metadata = excluded.metadata",
            params![info_hash.to_hex_string(), metadata],
        )?;

        if insert == 0 {
            Err(Error::InsertFailed {
                location: Location::caller(),
                driver: DRIVER,
            })
        } else {
            Ok(())
        }
    }

    /// Refer to [`databases::Database::load_metadata`](crate::core::databases::Database::load_metadata).
    async fn load_metadata(&self, info_hash: &InfoHash) -> Result<Option<Vec<u8>>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT metadata FROM metadata WHERE info_hash = ?1")?;

        let mut rows = stmt.query([info_hash.to_hex_string()])?;

        let row = rows.next()?;

        Ok(row.map(|row| row.get_unwrap::<_, Vec<u8>>(0)))
    }

    /// Refer to [`databases::Database::metadata_exists`](crate::core::databases::Database::metadata_exists).
    async fn metadata_exists(&self, info_hash: &InfoHash) -> Result<bool, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM metadata WHERE info_hash = ?1)",
            [info_hash.to_hex_string()],
            |row| row.get::<_, bool>(0),
        )?;

        Ok(exists)
    }

    /// Refer to [`databases::Database::list_info_hashes`](crate::core::databases::Database::list_info_hashes).
    async fn list_info_hashes(&self) -> Result<Vec<InfoHash>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT info_hash FROM metadata ORDER BY info_hash")?;

        let info_hash_iter = stmt.query_map([], |row| {
            let info_hash: String = row.get(0)?;

            Ok(InfoHash::from_str(&info_hash).unwrap())
        })?;

        let info_hashes: Vec<InfoHash> = info_hash_iter.filter_map(std::result::Result::ok).collect();

        Ok(info_hashes)
    }

    /// Refer to [`databases::Database::delete_torrent`](crate::core::databases::Database::delete_torrent).
    async fn delete_torrent(&self, info_hash: &InfoHash) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let tx = conn.transaction()?;

        tx.execute("DELETE FROM search WHERE info_hash = ?1", [info_hash.to_hex_string()])?;
        let deleted = tx.execute("DELETE FROM metadata WHERE info_hash = ?1", [info_hash.to_hex_string()])?;

        if deleted == 1 {
            // should only remove a single record.
            tx.commit()?;
            Ok(())
        } else {
            Err(Error::DeleteFailed {
                location: Location::caller(),
                error_code: deleted,
                driver: DRIVER,
            })
        }
    }

    /// Refer to [`databases::Database::upsert_scores`](crate::core::databases::Database::upsert_scores).
    async fn upsert_scores(&self, info_hash: &InfoHash, scores: &[(String, u32)]) -> Result<(), Error> {
        let mut conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let tx = conn.transaction()?;

        tx.execute("DELETE FROM search WHERE info_hash = ?1", [info_hash.to_hex_string()])?;

        for (token, score) in scores {
            tx.execute(
                "INSERT INTO search (token, info_hash, score) VALUES (?1, ?2, ?3)",
                params![token, info_hash.to_hex_string(), score],
            )?;
        }

        tx.commit()?;

        Ok(())
    }

    /// Refer to [`databases::Database::search_token`](crate::core::databases::Database::search_token).
    async fn search_token(&self, token: &str) -> Result<Vec<(InfoHash, u32)>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn.prepare("SELECT info_hash, score FROM search WHERE token = ?1 ORDER BY info_hash")?;

        let posting_iter = stmt.query_map([token], |row| {
            let info_hash_string: String = row.get(0)?;
            let info_hash = InfoHash::from_str(&info_hash_string).unwrap();
            let score: u32 = row.get(1)?;
            Ok((info_hash, score))
        })?;

        let postings: Vec<(InfoHash, u32)> = posting_iter.filter_map(std::result::Result::ok).collect();

        Ok(postings)
    }
}
