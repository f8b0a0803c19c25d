//! Local SQLite store for BLS series and the cache that fronts the remote API.
//!
//! - [`repository`]: upserts and queries over series, observations, freshness
//!   and extraction logs.
//! - [`cache::CachedFetcher`]: serves fresh series from the store and fetches
//!   only stale ones.
//! - [`aliases`] and [`seed`]: populate the alias and series tables from files.
//! - [`db`]: connections and embedded migrations.

pub mod aliases;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod period;
pub mod repository;
pub mod schema;
pub mod seed;
pub mod timestamps;

pub use cache::{CachedFetch, CachedFetcher, DataSource};
pub use repository::{SeriesRepo, SqliteRepo};
