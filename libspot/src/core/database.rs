use crate::Result;
use sqlx::{Pool, Sqlite, SqlitePool, sqlite::SqliteConnectOptions};
use std::path::Path;
use tracing::{debug, trace};

/// An object that represents a connection to the study spot database
#[derive(Clone, Debug)]
pub struct Database(Pool<Sqlite>);

impl From<Pool<Sqlite>> for Database {
    /// **WARNING**: This is primarily intended for tests. You should probably
    /// use [Database::open()] instead of creating the pool yourself, since
    /// [Database::open()] will perform database schema migration automatically.
    fn from(value: Pool<Sqlite>) -> Self {
        Self(value)
    }
}

impl Database {
    /// Open a connection to the specified database, creating the database file
    /// if it doesn't exist yet. This will also perform any necessary sql
    /// migrations to ensure that the database is up to date with the latest
    /// schema changes.
    pub async fn open<P: AsRef<Path>>(db: P) -> Result<Self> {
        debug!(path = ?db.as_ref(), "Opening database");
        let dbpool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db)
                .create_if_missing(true),
        )
        .await?;
        trace!("Running database migrations");
        sqlx::migrate!("../db/migrations").run(&dbpool).await?;
        Ok(Database(dbpool))
    }

    /// gets a reference to the underlying sqlx connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.0
    }

    /// Close all connections to the database and wait for them to finish.
    pub async fn close(&self) {
        debug!("Closing database");
        self.0.close().await
    }
}
