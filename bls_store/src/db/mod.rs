//! Database utilities for connections and schema migrations.
//!
//! - [`connection::connect_sqlite`] applies WAL, foreign_keys=ON, and a 5000ms busy_timeout.
//! - [`migrate::run_all`] applies the embedded migrations to a SQLite URL or bare path.
//!
//! Example:
//! ```no_run
//! use bls_store::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("bls_store_example.db");
//! migrate::run_all(db_path.to_str().unwrap()).expect("migrations");
//!
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;
