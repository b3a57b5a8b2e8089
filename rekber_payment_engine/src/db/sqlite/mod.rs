//! # SQLite backend
//!
//! Low-level database interactions live in the submodules as plain functions taking a `&mut SqliteConnection`.
//! Callers can hand them a pooled connection, or `&mut *tx` to compose several calls into one atomic transaction.
//! [`SqliteDatabase`] builds the trait implementations on top of them.

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub(crate) mod cancellations;
pub(crate) mod fund_releases;
pub(crate) mod orders;
pub(crate) mod payments;
pub(crate) mod proofs;
pub(crate) mod qris;

mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;

const SQLITE_DB_URL: &str = "sqlite://data/rekber_store.db";

pub fn db_url() -> String {
    let result = env::var("RPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("RPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Opens a connection pool and brings the schema up to date. The migrations are embedded in the binary, so a fresh
/// database file is ready to use straight away.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    sqlx::migrate!("./src/db/sqlite/migrations").run(&pool).await?;
    Ok(pool)
}
