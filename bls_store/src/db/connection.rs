//! SQLite connection helpers.
//!
//! [`connect_sqlite`] opens a connection and applies the connection-wide
//! PRAGMAs every caller relies on: WAL journaling, foreign_keys=ON, and a
//! 5000ms busy_timeout.
//!
//! Example:
//! ```no_run
//! use bls_store::db::connection::connect_sqlite;
//!
//! let path = std::env::temp_dir().join("bls_store_example.db");
//! let _conn = connect_sqlite(path.to_str().unwrap()).expect("open sqlite");
//! ```

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

/// Strips an optional `sqlite://` or `sqlite:` scheme, leaving the path diesel expects.
pub fn sqlite_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> anyhow::Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(sqlite_path(database_url))?;

    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}

/// Round-trips `SELECT 1` to prove the connection is usable.
pub fn health_check(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    let one: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1")).get_result(conn)?;
    anyhow::ensure!(one == 1, "unexpected health check result {one}");
    Ok(())
}
