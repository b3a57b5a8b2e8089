use std::path::Path;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Creates a fresh database at `url` and applies the schema. Call once at the top of each integration test.
pub async fn prepare_test_env(url: &str) {
    create_database(url).await;
    // Opening a connection runs the embedded migrations.
    let mut db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    let _ = crate::EscrowDatabase::close(&mut db).await;
    info!("🚀️ Migrations complete");
}

pub fn random_db_path() -> String {
    format!("sqlite:///tmp/rekber_test_{}.db", rand::random::<u64>())
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}
